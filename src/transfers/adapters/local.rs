//! Local in-process adapters.
//!
//! Stand-ins for the external collaborators, used by the default bootstrap
//! and demos. Deployments replace these with transport-backed adapters.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, warn};

use super::{EventPublisher, ParticipantDirectory, SettlementPolicy};
use crate::ledger::{LedgerAdapter, LedgerRequest, LedgerResponse};
use crate::transfers::error::TransferError;
use crate::transfers::events::DomainEvent;
use crate::transfers::types::{ExtensionItem, Participant};

/// Directory serving a fixed participant set, seeded from configuration.
pub struct StaticParticipantDirectory {
    participants: HashMap<String, Participant>,
}

impl StaticParticipantDirectory {
    pub fn new(participants: Vec<Participant>) -> Self {
        Self {
            participants: participants
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[async_trait]
impl ParticipantDirectory for StaticParticipantDirectory {
    async fn get_participant_info(
        &self,
        participant_id: &str,
    ) -> Result<Option<Participant>, TransferError> {
        Ok(self.participants.get(participant_id).cloned())
    }
}

/// Settlement policy that assigns one configured model to every transfer.
pub struct FixedSettlementPolicy {
    model: String,
}

impl FixedSettlementPolicy {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

#[async_trait]
impl SettlementPolicy for FixedSettlementPolicy {
    async fn get_settlement_model(
        &self,
        _amount: Decimal,
        _payer_currency: &str,
        _payee_currency: &str,
        _extensions: &[ExtensionItem],
    ) -> Result<Option<String>, TransferError> {
        Ok(Some(self.model.clone()))
    }
}

/// Ledger stub that approves every request. Development only.
#[derive(Debug, Default)]
pub struct ApprovingLedger;

#[async_trait]
impl LedgerAdapter for ApprovingLedger {
    async fn process_batch(
        &self,
        requests: &[LedgerRequest],
    ) -> Result<Vec<LedgerResponse>, TransferError> {
        Ok(requests
            .iter()
            .map(|request| LedgerResponse {
                request_id: request.request_id,
                request_type: request.request_type,
                success: true,
                error_message: None,
            })
            .collect())
    }
}

/// Publisher that writes events to the log stream.
#[derive(Debug, Default)]
pub struct LoggingEventPublisher;

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), TransferError> {
        for event in &events {
            match serde_json::to_string(event) {
                Ok(json) => info!(name = event.event.name(), event = %json, "event published"),
                Err(err) => warn!(name = event.event.name(), error = %err, "event not serializable"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerRequestType;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_static_directory_serves_seeded_participants() {
        let directory = StaticParticipantDirectory::new(vec![Participant {
            id: "dfsp-a".into(),
            name: "DFSP A".into(),
            is_active: true,
            accounts: Vec::new(),
        }]);

        assert!(directory
            .get_participant_info("dfsp-a")
            .await
            .unwrap()
            .is_some());
        assert!(directory
            .get_participant_info("dfsp-z")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_approving_ledger_answers_every_request() {
        let ledger = ApprovingLedger;
        let request = LedgerRequest {
            request_id: Uuid::new_v4(),
            request_type: LedgerRequestType::CheckLiquidityAndReserve,
            transfer_id: "t1".into(),
            transfer_amount: "10".into(),
            currency_code: "USD".into(),
            hub_account_id: Some("hub-usd".into()),
            payer_position_account_id: Some("a-pos".into()),
            payer_liquidity_account_id: Some("a-liq".into()),
            payee_position_account_id: None,
            payer_net_debit_cap: Some("0".into()),
        };

        let responses = ledger.process_batch(&[request.clone()]).await.unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].request_id, request.request_id);
        assert!(responses[0].success);
    }
}
