//! Batch command processing.
//!
//! One `process_batch` call is one cycle: dispatch every command's start
//! stage, make the primary ledger call, run the continue stages over its
//! responses, make the cancellation call if compensation queued any requests,
//! then flush the cache and publish. The last two run unconditionally,
//! whatever happened before.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use super::accounts::AccountResolver;
use super::adapters::{EventPublisher, SettlementPolicy, TransfersRepository};
use super::cache::TransferCache;
use super::commands::{CommandEnvelope, MessageType, TransferCommand};
use super::error::TransferError;
use super::events::{DomainEvent, TransferEvent};
use super::types::Transfer;
use crate::ledger::{LedgerAdapter, LedgerRequest, LedgerRequestType, LedgerResponse};

/// Command retained for the continue stages, with its routing token.
#[derive(Debug, Clone)]
pub(crate) struct BatchCommand {
    pub(crate) command: TransferCommand,
    pub(crate) opaque_token: Option<Value>,
}

/// Drives transfer commands through the two-phase protocol, one batch at a
/// time.
///
/// `process_batch` takes `&mut self`: a processor can only ever run one cycle
/// at a time, and the bootstrap keeps it on a single worker task.
pub struct BatchProcessor {
    pub(crate) repository: Arc<dyn TransfersRepository>,
    pub(crate) ledger: Arc<dyn LedgerAdapter>,
    pub(crate) settlement: Arc<dyn SettlementPolicy>,
    pub(crate) publisher: Arc<dyn EventPublisher>,
    pub(crate) resolver: AccountResolver,
    pub(crate) cache: TransferCache,
    pub(crate) batch_commands: HashMap<String, BatchCommand>,
    pub(crate) ledger_requests: Vec<LedgerRequest>,
    pub(crate) cancellation_requests: Vec<LedgerRequest>,
    pub(crate) output_events: Vec<DomainEvent>,
}

impl BatchProcessor {
    pub fn new(
        repository: Arc<dyn TransfersRepository>,
        ledger: Arc<dyn LedgerAdapter>,
        settlement: Arc<dyn SettlementPolicy>,
        publisher: Arc<dyn EventPublisher>,
        resolver: AccountResolver,
    ) -> Self {
        Self {
            repository,
            ledger,
            settlement,
            publisher,
            resolver,
            cache: TransferCache::new(),
            batch_commands: HashMap::new(),
            ledger_requests: Vec::new(),
            cancellation_requests: Vec::new(),
            output_events: Vec::new(),
        }
    }

    /// Process one batch of inbound messages.
    ///
    /// The cache flush and the event publish run even when the cycle errors;
    /// the first error (cycle, then flush, then publish) is surfaced to the
    /// caller after both have run.
    pub async fn process_batch(
        &mut self,
        commands: Vec<CommandEnvelope>,
    ) -> Result<(), TransferError> {
        self.reset_cycle();

        let outcome = self.run_cycle(commands).await;
        if let Err(err) = &outcome {
            error!(error = %err, "batch cycle aborted");
        }

        let flushed = self.cache.flush(self.repository.as_ref()).await;
        if let Err(err) = &flushed {
            error!(error = %err, "transfer cache flush failed");
        }

        let events = std::mem::take(&mut self.output_events);
        debug!(count = events.len(), "publishing cycle events");
        let published = self.publisher.publish(events).await;

        outcome?;
        flushed?;
        published
    }

    fn reset_cycle(&mut self) {
        self.batch_commands.clear();
        self.ledger_requests.clear();
        self.cancellation_requests.clear();
        self.output_events.clear();
    }

    async fn run_cycle(&mut self, commands: Vec<CommandEnvelope>) -> Result<(), TransferError> {
        for envelope in commands {
            if envelope.msg_type != MessageType::Command {
                continue;
            }

            match TransferCommand::parse(&envelope) {
                Ok(Some(command)) => {
                    self.dispatch_command(command, envelope.opaque_token).await?;
                }
                Ok(None) => {
                    warn!(msg_name = %envelope.msg_name, "ignoring unrecognized command name");
                }
                Err(err) => {
                    warn!(msg_name = %envelope.msg_name, error = %err, "rejecting malformed command");
                }
            }
        }

        if self.ledger_requests.is_empty() {
            return Ok(());
        }

        debug!(count = self.ledger_requests.len(), "issuing primary ledger batch");
        let responses = self.ledger.process_batch(&self.ledger_requests).await?;
        for response in responses {
            self.handle_ledger_response(response).await?;
        }

        if !self.cancellation_requests.is_empty() {
            // Fire-and-forget: cancellation outcomes are not fed back into
            // the cycle.
            debug!(
                count = self.cancellation_requests.len(),
                "issuing cancellation ledger batch"
            );
            self.ledger.process_batch(&self.cancellation_requests).await?;
        }

        Ok(())
    }

    async fn dispatch_command(
        &mut self,
        command: TransferCommand,
        opaque_token: Option<Value>,
    ) -> Result<(), TransferError> {
        self.batch_commands.insert(
            command.transfer_id().to_string(),
            BatchCommand {
                command: command.clone(),
                opaque_token: opaque_token.clone(),
            },
        );

        match command {
            TransferCommand::Prepare(payload) => self.prepare_start(payload, opaque_token).await,
            TransferCommand::Fulfil(payload) => self.fulfil_start(payload, opaque_token).await,
        }
    }

    async fn handle_ledger_response(
        &mut self,
        response: LedgerResponse,
    ) -> Result<(), TransferError> {
        let request = self
            .ledger_requests
            .iter()
            .find(|r| r.request_id == response.request_id)
            .cloned()
            .ok_or_else(|| TransferError::MissingLedgerRequest(response.request_id.to_string()))?;

        let original = self
            .batch_commands
            .get(&request.transfer_id)
            .cloned()
            .ok_or_else(|| TransferError::MissingCommand(request.transfer_id.clone()))?;

        // An absent transfer is handled inside the continue stages; a lookup
        // failure is terminal for this transfer right here.
        let transfer = match self.load_transfer(&request.transfer_id).await {
            Ok(transfer) => transfer,
            Err(err) => {
                error!(transfer_id = %request.transfer_id, error = %err, "transfer lookup failed");
                self.push_event(
                    TransferEvent::TransferLookupFailed {
                        transfer_id: request.transfer_id.clone(),
                        error_description: format!(
                            "Unable to load transfer {}: {}",
                            request.transfer_id, err
                        ),
                    },
                    original.opaque_token,
                );
                return Ok(());
            }
        };

        match request.request_type {
            LedgerRequestType::CheckLiquidityAndReserve => {
                self.prepare_continue(response, request, original, transfer).await
            }
            LedgerRequestType::CancelReservationAndCommit => {
                self.fulfil_continue(response, request, original, transfer).await
            }
            LedgerRequestType::CancelReservation => Err(TransferError::UnprocessedResponseType),
        }
    }

    /// Load a transfer through the cache, falling back to the repository.
    pub(crate) async fn load_transfer(
        &mut self,
        transfer_id: &str,
    ) -> Result<Option<Transfer>, TransferError> {
        if let Some(transfer) = self.cache.get(transfer_id) {
            return Ok(Some(transfer));
        }

        match self.repository.get_transfer_by_id(transfer_id).await? {
            Some(transfer) => {
                self.cache.put(transfer.clone());
                Ok(Some(transfer))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn push_event(&mut self, event: TransferEvent, opaque_token: Option<Value>) {
        debug!(name = event.name(), is_error = event.is_error(), "queueing event");
        self.output_events.push(DomainEvent::new(event, opaque_token));
    }
}
