//! Ledger boundary: batched two-phase requests and responses.
//!
//! The core never talks to ledger accounts one by one; each processing cycle
//! produces at most two batches (primary, then cancellations) and every
//! request must come back with exactly one response, matched by request id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transfers::accounts::TransferAccounts;
use crate::transfers::error::TransferError;
use crate::transfers::types::Transfer;

/// Ledger operations the core can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerRequestType {
    /// Verify and hold payer funds pending commit
    CheckLiquidityAndReserve,
    /// Release the hold and post the transfer
    CancelReservationAndCommit,
    /// Release the hold without posting (compensation)
    CancelReservation,
}

impl LedgerRequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerRequestType::CheckLiquidityAndReserve => "checkLiquidityAndReserve",
            LedgerRequestType::CancelReservationAndCommit => "cancelReservationAndCommit",
            LedgerRequestType::CancelReservation => "cancelReservation",
        }
    }
}

impl std::fmt::Display for LedgerRequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of a ledger batch call.
///
/// Carries only the account ids relevant to its request type; the rest stay
/// `None`. The net debit cap is modeled on the reserve request but not
/// enforced by this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRequest {
    pub request_id: Uuid,
    pub request_type: LedgerRequestType,
    pub transfer_id: String,
    pub transfer_amount: String,
    pub currency_code: String,
    pub hub_account_id: Option<String>,
    pub payer_position_account_id: Option<String>,
    pub payer_liquidity_account_id: Option<String>,
    pub payee_position_account_id: Option<String>,
    pub payer_net_debit_cap: Option<String>,
}

impl LedgerRequest {
    /// Reserve request issued by the prepare stage: payer position, payer
    /// liquidity and hub accounts; no payee account yet.
    pub fn check_liquidity_and_reserve(transfer: &Transfer, accounts: &TransferAccounts) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            request_type: LedgerRequestType::CheckLiquidityAndReserve,
            transfer_id: transfer.transfer_id.clone(),
            transfer_amount: transfer.amount.clone(),
            currency_code: transfer.currency_code.clone(),
            hub_account_id: Some(accounts.hub.id.clone()),
            payer_position_account_id: Some(accounts.payer_position.id.clone()),
            payer_liquidity_account_id: Some(accounts.payer_liquidity.id.clone()),
            payee_position_account_id: None,
            payer_net_debit_cap: Some("0".to_string()),
        }
    }

    /// Commit request issued by the fulfil stage: payer position, payee
    /// position and hub accounts.
    pub fn cancel_reservation_and_commit(transfer: &Transfer, accounts: &TransferAccounts) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            request_type: LedgerRequestType::CancelReservationAndCommit,
            transfer_id: transfer.transfer_id.clone(),
            transfer_amount: transfer.amount.clone(),
            currency_code: transfer.currency_code.clone(),
            hub_account_id: Some(accounts.hub.id.clone()),
            payer_position_account_id: Some(accounts.payer_position.id.clone()),
            payer_liquidity_account_id: None,
            payee_position_account_id: Some(accounts.payee_position.id.clone()),
            payer_net_debit_cap: None,
        }
    }

    /// Compensation request: undo a prior reserve.
    pub fn cancel_reservation(transfer: &Transfer, accounts: &TransferAccounts) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            request_type: LedgerRequestType::CancelReservation,
            transfer_id: transfer.transfer_id.clone(),
            transfer_amount: transfer.amount.clone(),
            currency_code: transfer.currency_code.clone(),
            hub_account_id: Some(accounts.hub.id.clone()),
            payer_position_account_id: Some(accounts.payer_position.id.clone()),
            payer_liquidity_account_id: Some(accounts.payer_liquidity.id.clone()),
            payee_position_account_id: None,
            payer_net_debit_cap: None,
        }
    }
}

/// Per-request outcome of a ledger batch call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    pub request_id: Uuid,
    pub request_type: LedgerRequestType,
    pub success: bool,
    pub error_message: Option<String>,
}

/// External ledger service.
///
/// One response per request; response order need not match request order.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    async fn process_batch(
        &self,
        requests: &[LedgerRequest],
    ) -> Result<Vec<LedgerResponse>, TransferError>;
}
