//! Reservation cancellation (compensation).
//!
//! Invoked whenever a later stage fails after funds may have been reserved.
//! Queues a cancellation request for the second ledger batch and marks the
//! transfer rejected.

use tracing::{error, info};

use super::error::TransferError;
use super::processor::BatchProcessor;
use super::state::TransferState;
use crate::ledger::LedgerRequest;

impl BatchProcessor {
    /// Cancel the reservation held for a transfer.
    ///
    /// Any internal failure is wrapped into a single `UnableToCancel` kind;
    /// callers downgrade their in-flight event on it.
    pub(crate) async fn cancel_transfer(&mut self, transfer_id: &str) -> Result<(), TransferError> {
        match self.try_cancel(transfer_id).await {
            Ok(()) => {
                info!(transfer_id = %transfer_id, "reservation cancellation queued");
                Ok(())
            }
            Err(err) => {
                error!(transfer_id = %transfer_id, error = %err, "cancellation failed");
                Err(TransferError::UnableToCancel(
                    transfer_id.to_string(),
                    err.to_string(),
                ))
            }
        }
    }

    async fn try_cancel(&mut self, transfer_id: &str) -> Result<(), TransferError> {
        let mut transfer = self
            .cache
            .get(transfer_id)
            .ok_or_else(|| TransferError::TransferNotFound(transfer_id.to_string()))?;

        let participants = self
            .resolver
            .resolve_participants(&transfer.payer_fsp_id, &transfer.payee_fsp_id, transfer_id)
            .await?;
        let accounts = self.resolver.resolve_accounts(&participants, &transfer)?;

        self.cancellation_requests
            .push(LedgerRequest::cancel_reservation(&transfer, &accounts));

        transfer.transfer_state = TransferState::Rejected;
        transfer.touch();
        self.cache.put(transfer.clone());

        // The rejection must survive even if the rest of the cycle fails, so
        // this write does not wait for the batch-end flush.
        self.repository.update_transfer(&transfer).await?;

        Ok(())
    }
}
