//! Transfers aggregate
//!
//! Drives batches of prepare/fulfil commands through a two-phase
//! reserve/commit protocol against the external ledger.
//!
//! # State Machine
//!
//! ```text
//! RECEIVED → RESERVED → COMMITTED
//!     │          │
//!     └──────────┴──→ REJECTED       (cancellation / compensation)
//!
//! ABORTED: terminal, assigned externally, recognized only
//! ```
//!
//! # Cycle Invariants
//!
//! 1. **One batch at a time**: `process_batch` takes `&mut self` and runs on
//!    a single worker task; a cycle fully completes (flush + publish) before
//!    the next starts.
//! 2. **One terminal event per transfer per cycle**: every transfer-scoped
//!    failure maps to exactly one event kind; compensation failures replace
//!    the in-flight event instead of adding a second one.
//! 3. **Cleanup always runs**: the cache flush and the event publish execute
//!    even when the cycle aborts mid-way.

pub mod accounts;
pub mod adapters;
pub mod cache;
pub mod commands;
pub mod error;
pub mod events;
pub mod processor;
pub mod state;
pub mod types;
pub mod worker;

mod compensation;
mod fulfil;
mod prepare;


// Re-exports for convenience
pub use accounts::{AccountResolver, AccountResolverConfig, TransferAccounts, TransferParticipants};
pub use adapters::{
    EventPublisher, ParticipantDirectory, SettlementPolicy, TransferSearchFilter,
    TransfersRepository,
};
pub use cache::TransferCache;
pub use commands::{
    COMMIT_TRANSFER_FULFIL_CMD, CommandEnvelope, CommitTransferFulfilPayload, MessageType,
    PREPARE_TRANSFER_CMD, PrepareTransferPayload, TransferCommand,
};
pub use error::{ResolutionError, TransferError};
pub use events::{DomainEvent, TransferEvent};
pub use processor::BatchProcessor;
pub use state::TransferState;
pub use types::{
    AccountType, ExtensionItem, ExtensionList, HUB_PARTICIPANT_ID, Participant,
    ParticipantAccount, Transfer, prepare_hash,
};
pub use worker::{BatchWorker, WorkerConfig, command_channel};
