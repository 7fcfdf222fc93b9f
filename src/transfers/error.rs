//! Error taxonomy for the transfers core.
//!
//! Resolution failures carry an explicit kind per missing entity so callers
//! can map them to events with an exhaustive `match` instead of downcasting.

use thiserror::Error;

/// Participant and account resolution failures.
///
/// One distinct kind per missing entity; account kinds cover all five
/// (owner, type) combinations a transfer needs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Hub participant not found: {0}")]
    HubNotFound(String),

    #[error("Payer participant not found: {0}")]
    PayerParticipantNotFound(String),

    #[error("Payee participant not found: {0}")]
    PayeeParticipantNotFound(String),

    #[error("Hub account not found for currency {0}")]
    HubAccountNotFound(String),

    #[error("Payer position account not found for currency {0}")]
    PayerPositionAccountNotFound(String),

    #[error("Payer liquidity account not found for currency {0}")]
    PayerLiquidityAccountNotFound(String),

    #[error("Payee position account not found for currency {0}")]
    PayeePositionAccountNotFound(String),

    #[error("Payee liquidity account not found for currency {0}")]
    PayeeLiquidityAccountNotFound(String),

    #[error("Participant directory failure: {0}")]
    Directory(String),
}

/// Transfers core error types
#[derive(Error, Debug, Clone)]
pub enum TransferError {
    // === Malformed input (command rejected, no event) ===
    #[error("Command payload is missing or invalid")]
    InvalidPayload,

    #[error("Message name is missing")]
    InvalidMessageName,

    // === Not-found ===
    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    // === Infrastructure ===
    #[error("Repository failure: {0}")]
    Repository(String),

    #[error("Settlement policy failure: {0}")]
    SettlementLookup(String),

    #[error("Ledger adapter failure: {0}")]
    Ledger(String),

    #[error("Event publish failure: {0}")]
    Publish(String),

    // === Cross-cutting cycle errors (abort remaining dispatch) ===
    #[error("No ledger request matches response {0}")]
    MissingLedgerRequest(String),

    #[error("No command in this batch for transfer {0}")]
    MissingCommand(String),

    #[error("Cancellation responses are not processed in-cycle")]
    UnprocessedResponseType,

    // === Compensation ===
    #[error("Unable to cancel reservation for transfer {0}: {1}")]
    UnableToCancel(String, String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl TransferError {
    /// Malformed-input errors reject a single command without aborting the cycle.
    #[inline]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TransferError::InvalidPayload | TransferError::InvalidMessageName
        )
    }
}
