//! Collaborator contracts consumed by the transfers core.
//!
//! The core only ever sees these traits; concrete transports (message bus,
//! HTTP directory, database) live behind them in the surrounding services.

pub mod local;
pub mod memory;

pub use local::{
    ApprovingLedger, FixedSettlementPolicy, LoggingEventPublisher, StaticParticipantDirectory,
};
pub use memory::InMemoryTransfersRepository;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::error::TransferError;
use super::events::DomainEvent;
use super::state::TransferState;
use super::types::{ExtensionItem, Participant, Transfer};

/// Admin search criteria over stored transfers. All fields are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct TransferSearchFilter {
    pub id: Option<String>,
    pub state: Option<TransferState>,
    pub currency_code: Option<String>,
    /// Inclusive lower bound on `created_at` (epoch millis)
    pub start_date: Option<i64>,
    /// Inclusive upper bound on `created_at` (epoch millis)
    pub end_date: Option<i64>,
}

/// Durable transfer store.
#[async_trait]
pub trait TransfersRepository: Send + Sync {
    async fn get_transfer_by_id(&self, transfer_id: &str)
    -> Result<Option<Transfer>, TransferError>;

    async fn get_transfers(&self) -> Result<Vec<Transfer>, TransferError>;

    async fn search_transfers(
        &self,
        filter: &TransferSearchFilter,
    ) -> Result<Vec<Transfer>, TransferError>;

    /// Upsert a batch of transfers. Must be safe to call with an empty list.
    async fn store_transfers(&self, transfers: Vec<Transfer>) -> Result<(), TransferError>;

    async fn update_transfer(&self, transfer: &Transfer) -> Result<(), TransferError>;
}

/// External participant directory.
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    async fn get_participant_info(
        &self,
        participant_id: &str,
    ) -> Result<Option<Participant>, TransferError>;
}

/// Settlement eligibility policy.
#[async_trait]
pub trait SettlementPolicy: Send + Sync {
    /// Resolve the settlement model governing a transfer, or `None` when no
    /// model applies.
    async fn get_settlement_model(
        &self,
        amount: Decimal,
        payer_currency: &str,
        payee_currency: &str,
        extensions: &[ExtensionItem],
    ) -> Result<Option<String>, TransferError>;
}

/// Outbound event sink, called exactly once per cycle.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), TransferError>;
}
