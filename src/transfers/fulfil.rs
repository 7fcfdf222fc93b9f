//! Fulfil protocol: commit or reject a reserved transfer.

use serde_json::Value;
use tracing::{debug, error, warn};

use super::commands::{CommitTransferFulfilPayload, TransferCommand};
use super::error::TransferError;
use super::events::TransferEvent;
use super::processor::{BatchCommand, BatchProcessor};
use super::state::TransferState;
use super::types::Transfer;
use crate::ledger::{LedgerRequest, LedgerResponse};

impl BatchProcessor {
    /// Start stage: locate the reserved transfer, resolve accounts and queue
    /// the commit request. Unlike prepare, every failure here attempts
    /// compensation.
    pub(crate) async fn fulfil_start(
        &mut self,
        payload: CommitTransferFulfilPayload,
        opaque_token: Option<Value>,
    ) -> Result<(), TransferError> {
        debug!(transfer_id = %payload.transfer_id, "fulfil_start");

        let transfer = match self.load_transfer(&payload.transfer_id).await {
            Ok(transfer) => transfer,
            Err(err) => {
                error!(transfer_id = %payload.transfer_id, error = %err, "transfer lookup failed");
                self.push_event(
                    TransferEvent::TransferLookupFailed {
                        transfer_id: payload.transfer_id.clone(),
                        error_description: format!(
                            "Unable to load transfer {}: {}",
                            payload.transfer_id, err
                        ),
                    },
                    opaque_token,
                );
                return Ok(());
            }
        };

        let Some(transfer) = transfer else {
            let mut event = TransferEvent::TransferNotFound {
                transfer_id: payload.transfer_id.clone(),
                error_description: format!(
                    "No transfer found for fulfil command on {}",
                    payload.transfer_id
                ),
            };

            if let Err(err) = self.cancel_transfer(&payload.transfer_id).await {
                error!(transfer_id = %payload.transfer_id, error = %err, "best-effort cancellation failed");
                event = TransferEvent::CancelReservationFailed {
                    transfer_id: payload.transfer_id.clone(),
                    error_description: format!(
                        "Unable to cancel reservation for transfer {}",
                        payload.transfer_id
                    ),
                };
            }

            self.push_event(event, opaque_token);
            return Ok(());
        };

        let participants = match self
            .resolver
            .resolve_participants(&transfer.payer_fsp_id, &transfer.payee_fsp_id, &transfer.transfer_id)
            .await
        {
            Ok(participants) => participants,
            Err(err) => {
                let mut event = TransferEvent::resolution_failure(&transfer, &err);
                if let Err(cancel_err) = self.cancel_transfer(&transfer.transfer_id).await {
                    error!(transfer_id = %transfer.transfer_id, error = %cancel_err, "best-effort cancellation failed");
                    event = TransferEvent::CancelReservationFailed {
                        transfer_id: transfer.transfer_id.clone(),
                        error_description: format!(
                            "Unable to cancel reservation for transfer {}",
                            transfer.transfer_id
                        ),
                    };
                }
                self.push_event(event, opaque_token);
                return Ok(());
            }
        };

        let accounts = match self.resolver.resolve_accounts(&participants, &transfer) {
            Ok(accounts) => accounts,
            Err(err) => {
                let mut event = TransferEvent::resolution_failure(&transfer, &err);
                if let Err(cancel_err) = self.cancel_transfer(&transfer.transfer_id).await {
                    error!(transfer_id = %transfer.transfer_id, error = %cancel_err, "best-effort cancellation failed");
                    event = TransferEvent::CancelReservationFailed {
                        transfer_id: transfer.transfer_id.clone(),
                        error_description: format!(
                            "Unable to cancel reservation for transfer {}",
                            transfer.transfer_id
                        ),
                    };
                }
                self.push_event(event, opaque_token);
                return Ok(());
            }
        };

        self.ledger_requests
            .push(LedgerRequest::cancel_reservation_and_commit(&transfer, &accounts));

        debug!(transfer_id = %transfer.transfer_id, "fulfil_start complete");
        Ok(())
    }

    /// Continue stage: apply the commit outcome.
    pub(crate) async fn fulfil_continue(
        &mut self,
        response: LedgerResponse,
        request: LedgerRequest,
        original: BatchCommand,
        transfer: Option<Transfer>,
    ) -> Result<(), TransferError> {
        let Some(mut transfer) = transfer else {
            error!(transfer_id = %request.transfer_id, "no transfer for commit response");
            let mut event = TransferEvent::TransferNotFound {
                transfer_id: request.transfer_id.clone(),
                error_description: format!(
                    "No transfer found for commit response on {}",
                    request.transfer_id
                ),
            };

            if let Err(err) = self.cancel_transfer(&request.transfer_id).await {
                error!(transfer_id = %request.transfer_id, error = %err, "best-effort cancellation failed");
                event = TransferEvent::CancelReservationFailed {
                    transfer_id: request.transfer_id.clone(),
                    error_description: format!(
                        "Unable to cancel reservation for transfer {}",
                        request.transfer_id
                    ),
                };
            }

            self.push_event(event, original.opaque_token);
            return Ok(());
        };

        debug!(transfer_id = %transfer.transfer_id, "fulfil_continue");

        if !response.success {
            warn!(
                transfer_id = %transfer.transfer_id,
                error = response.error_message.as_deref().unwrap_or("unspecified"),
                "commit refused by ledger"
            );

            transfer.transfer_state = TransferState::Rejected;
            transfer.touch();
            self.cache.put(transfer.clone());

            let mut event = TransferEvent::CommitFailed {
                transfer_id: transfer.transfer_id.clone(),
                error_description: format!("Unable to commit transfer {}", transfer.transfer_id),
            };

            if let Err(err) = self.cancel_transfer(&transfer.transfer_id).await {
                error!(transfer_id = %transfer.transfer_id, error = %err, "best-effort cancellation failed");
                event = TransferEvent::CancelReservationFailed {
                    transfer_id: transfer.transfer_id.clone(),
                    error_description: format!(
                        "Unable to cancel reservation for transfer {}",
                        transfer.transfer_id
                    ),
                };
            }

            self.push_event(event, original.opaque_token);
            return Ok(());
        }

        let TransferCommand::Fulfil(payload) = &original.command else {
            return Err(TransferError::MissingCommand(transfer.transfer_id.clone()));
        };

        transfer.transfer_state = TransferState::Committed;
        transfer.fulfilment = Some(payload.fulfilment.clone());
        transfer.completed_timestamp = Some(payload.completed_timestamp);
        transfer.extension_list = payload.extension_list.clone();
        transfer.touch();
        self.cache.put(transfer.clone());

        self.push_event(
            TransferEvent::TransferCommitted {
                transfer_id: transfer.transfer_id.clone(),
                fulfilment: payload.fulfilment.clone(),
                completed_timestamp: payload.completed_timestamp,
                extension_list: payload.extension_list.clone(),
                payer_fsp_id: transfer.payer_fsp_id.clone(),
                payee_fsp_id: transfer.payee_fsp_id.clone(),
                amount: transfer.amount.clone(),
                currency_code: transfer.currency_code.clone(),
                settlement_model: transfer.settlement_model.clone(),
            },
            original.opaque_token,
        );

        debug!(transfer_id = %transfer.transfer_id, "fulfil_continue complete");
        Ok(())
    }
}
