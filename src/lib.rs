//! Transfer Switch - payment-switch transfers core
//!
//! Drives batches of transfer commands through a two-phase reserve/commit
//! protocol against an external ledger.
//!
//! # Modules
//!
//! - [`transfers`] - the transfer aggregate: state machine, batch processor,
//!   account resolution, cache, collaborator contracts
//! - [`ledger`] - batched ledger requests/responses and the ledger adapter
//! - [`admin_api`] - read-only HTTP query routes over stored transfers
//! - [`config`] - yaml application configuration
//! - [`logging`] - tracing subscriber setup

pub mod admin_api;
pub mod config;
pub mod ledger;
pub mod logging;
pub mod transfers;

// Convenient re-exports at crate root
pub use ledger::{LedgerAdapter, LedgerRequest, LedgerRequestType, LedgerResponse};
pub use transfers::{
    AccountResolver, AccountResolverConfig, BatchProcessor, BatchWorker, CommandEnvelope,
    DomainEvent, Participant, ParticipantAccount, Transfer, TransferError, TransferEvent,
    TransferState, WorkerConfig, command_channel,
};
