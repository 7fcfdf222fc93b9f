//! Prepare protocol: reserve funds for a transfer.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::commands::PrepareTransferPayload;
use super::error::TransferError;
use super::events::TransferEvent;
use super::processor::{BatchCommand, BatchProcessor};
use super::state::TransferState;
use super::types::{Transfer, prepare_hash};
use crate::ledger::{LedgerRequest, LedgerResponse};

impl BatchProcessor {
    /// Start stage: validate against duplicates, resolve the settlement
    /// model and the accounts, then queue the reserve request.
    pub(crate) async fn prepare_start(
        &mut self,
        payload: PrepareTransferPayload,
        opaque_token: Option<Value>,
    ) -> Result<(), TransferError> {
        debug!(transfer_id = %payload.transfer_id, "prepare_start");

        let hash = prepare_hash(
            &payload.transfer_id,
            &payload.payee_fsp,
            &payload.payer_fsp,
            &payload.amount,
            payload.expiration,
        );

        // Duplicate detection consults the cycle cache only; a transfer
        // already flushed out of it is reprocessed as new.
        if let Some(existing) = self.cache.get(&payload.transfer_id) {
            if existing.transfer_state.is_in_flight() {
                debug!(transfer_id = %existing.transfer_id, "in-flight duplicate prepare ignored");
                return Ok(());
            }

            // Terminal state: answer with the stored outcome, no reprocessing.
            debug!(
                transfer_id = %existing.transfer_id,
                state = %existing.transfer_state,
                "terminal duplicate prepare answered from stored outcome"
            );
            self.push_event(TransferEvent::query_response(&existing), opaque_token);
            return Ok(());
        }

        let amount = match Decimal::from_str(&payload.amount) {
            Ok(amount) => amount,
            Err(err) => {
                warn!(transfer_id = %payload.transfer_id, error = %err, "amount is not a valid decimal");
                self.push_event(
                    TransferEvent::SettlementLookupFailed {
                        transfer_id: payload.transfer_id.clone(),
                        amount: payload.amount.clone(),
                        payer_currency: payload.currency_code.clone(),
                        payee_currency: payload.currency_code.clone(),
                        error_description: format!("Invalid transfer amount: {err}"),
                    },
                    opaque_token,
                );
                return Ok(());
            }
        };

        let extensions = payload
            .extension_list
            .as_ref()
            .map(|l| l.extension.as_slice())
            .unwrap_or(&[]);

        let settlement_model = match self
            .settlement
            .get_settlement_model(amount, &payload.currency_code, &payload.currency_code, extensions)
            .await
        {
            Ok(Some(model)) => model,
            Ok(None) => {
                warn!(transfer_id = %payload.transfer_id, "no settlement model applies");
                self.push_event(
                    TransferEvent::SettlementModelNotFound {
                        transfer_id: payload.transfer_id.clone(),
                        amount: payload.amount.clone(),
                        payer_currency: payload.currency_code.clone(),
                        payee_currency: payload.currency_code.clone(),
                        error_description: format!(
                            "Settlement model not found for transfer {}",
                            payload.transfer_id
                        ),
                    },
                    opaque_token,
                );
                return Ok(());
            }
            Err(err) => {
                error!(transfer_id = %payload.transfer_id, error = %err, "settlement model lookup failed");
                self.push_event(
                    TransferEvent::SettlementLookupFailed {
                        transfer_id: payload.transfer_id.clone(),
                        amount: payload.amount.clone(),
                        payer_currency: payload.currency_code.clone(),
                        payee_currency: payload.currency_code.clone(),
                        error_description: format!(
                            "Unable to resolve settlement model for transfer {}",
                            payload.transfer_id
                        ),
                    },
                    opaque_token,
                );
                return Ok(());
            }
        };

        let transfer = Transfer::new(
            payload.transfer_id,
            payload.payer_fsp,
            payload.payee_fsp,
            payload.amount,
            payload.currency_code,
            payload.ilp_packet,
            payload.condition,
            payload.expiration,
            payload.extension_list,
            settlement_model,
            hash,
        );

        let participants = match self
            .resolver
            .resolve_participants(&transfer.payer_fsp_id, &transfer.payee_fsp_id, &transfer.transfer_id)
            .await
        {
            Ok(participants) => participants,
            Err(err) => {
                self.push_event(TransferEvent::resolution_failure(&transfer, &err), opaque_token);
                return Ok(());
            }
        };

        let accounts = match self.resolver.resolve_accounts(&participants, &transfer) {
            Ok(accounts) => accounts,
            Err(err) => {
                self.push_event(TransferEvent::resolution_failure(&transfer, &err), opaque_token);
                return Ok(());
            }
        };

        self.cache.put(transfer.clone());
        self.ledger_requests
            .push(LedgerRequest::check_liquidity_and_reserve(&transfer, &accounts));

        debug!(transfer_id = %transfer.transfer_id, "prepare_start complete");
        Ok(())
    }

    /// Continue stage: apply the reservation outcome.
    pub(crate) async fn prepare_continue(
        &mut self,
        response: LedgerResponse,
        request: LedgerRequest,
        original: BatchCommand,
        transfer: Option<Transfer>,
    ) -> Result<(), TransferError> {
        let Some(mut transfer) = transfer else {
            error!(transfer_id = %request.transfer_id, "no transfer for reservation response");
            let mut event = TransferEvent::TransferNotFound {
                transfer_id: request.transfer_id.clone(),
                error_description: format!(
                    "No transfer found for reservation response on {}",
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

        debug!(transfer_id = %transfer.transfer_id, "prepare_continue");

        if !response.success {
            // The reservation never took hold, so there is nothing to cancel.
            warn!(
                transfer_id = %transfer.transfer_id,
                error = response.error_message.as_deref().unwrap_or("unspecified"),
                "liquidity check failed"
            );
            self.push_event(
                TransferEvent::LiquidityCheckFailed {
                    transfer_id: transfer.transfer_id.clone(),
                    payer_fsp_id: transfer.payer_fsp_id.clone(),
                    amount: transfer.amount.clone(),
                    currency_code: transfer.currency_code.clone(),
                    error_description: format!(
                        "Unable to check liquidity and reserve for transfer {}",
                        transfer.transfer_id
                    ),
                },
                original.opaque_token,
            );
            return Ok(());
        }

        transfer.transfer_state = TransferState::Reserved;
        transfer.touch();
        self.cache.put(transfer.clone());

        self.push_event(
            TransferEvent::TransferPrepared {
                transfer_id: transfer.transfer_id.clone(),
                payer_fsp_id: transfer.payer_fsp_id.clone(),
                payee_fsp_id: transfer.payee_fsp_id.clone(),
                amount: transfer.amount.clone(),
                currency_code: transfer.currency_code.clone(),
                ilp_packet: transfer.ilp_packet.clone(),
                condition: transfer.condition.clone(),
                expiration: transfer.expiration_timestamp,
                extension_list: transfer.extension_list.clone(),
            },
            original.opaque_token,
        );

        debug!(transfer_id = %transfer.transfer_id, "prepare_continue complete");
        Ok(())
    }
}
