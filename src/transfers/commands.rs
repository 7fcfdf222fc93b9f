//! Inbound command messages.
//!
//! The bus adapter hands the core loosely-typed envelopes; dispatch parses
//! them into typed payloads by command name. The opaque token travels from
//! the envelope onto every event the command produces.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TransferError;
use super::types::ExtensionList;

/// Command name for the prepare phase.
pub const PREPARE_TRANSFER_CMD: &str = "PrepareTransferCmd";
/// Command name for the fulfil/commit phase.
pub const COMMIT_TRANSFER_FULFIL_CMD: &str = "CommitTransferFulfilCmd";

/// Message class of an inbound envelope. Only commands are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Command,
    DomainEvent,
    #[serde(other)]
    Unknown,
}

/// Inbound message envelope as delivered by the bus adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    pub msg_type: MessageType,
    #[serde(default)]
    pub msg_name: String,
    #[serde(default)]
    pub payload: Option<Value>,
    /// Opaque routing token, forwarded verbatim on every derived event
    #[serde(default)]
    pub opaque_token: Option<Value>,
}

impl CommandEnvelope {
    /// Build a prepare command envelope (bootstrap and test feed).
    pub fn prepare(payload: &PrepareTransferPayload, opaque_token: Option<Value>) -> Self {
        Self {
            msg_type: MessageType::Command,
            msg_name: PREPARE_TRANSFER_CMD.to_string(),
            payload: Some(serde_json::to_value(payload).expect("payload serializes infallibly")),
            opaque_token,
        }
    }

    /// Build a fulfil command envelope (bootstrap and test feed).
    pub fn fulfil(payload: &CommitTransferFulfilPayload, opaque_token: Option<Value>) -> Self {
        Self {
            msg_type: MessageType::Command,
            msg_name: COMMIT_TRANSFER_FULFIL_CMD.to_string(),
            payload: Some(serde_json::to_value(payload).expect("payload serializes infallibly")),
            opaque_token,
        }
    }
}

/// Prepare-phase payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareTransferPayload {
    pub transfer_id: String,
    pub payer_fsp: String,
    pub payee_fsp: String,
    pub amount: String,
    pub currency_code: String,
    pub ilp_packet: String,
    pub condition: String,
    /// Expiration of the prepare request (epoch millis)
    pub expiration: i64,
    #[serde(default)]
    pub extension_list: Option<ExtensionList>,
}

/// Fulfil-phase payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitTransferFulfilPayload {
    pub transfer_id: String,
    pub fulfilment: String,
    /// Completion timestamp reported by the payee (epoch millis)
    pub completed_timestamp: i64,
    #[serde(default)]
    pub extension_list: Option<ExtensionList>,
}

/// A command parsed out of an envelope, ready for dispatch.
#[derive(Debug, Clone)]
pub enum TransferCommand {
    Prepare(PrepareTransferPayload),
    Fulfil(CommitTransferFulfilPayload),
}

impl TransferCommand {
    /// The transfer this command addresses.
    pub fn transfer_id(&self) -> &str {
        match self {
            TransferCommand::Prepare(p) => &p.transfer_id,
            TransferCommand::Fulfil(p) => &p.transfer_id,
        }
    }

    /// Parse an envelope into a typed command.
    ///
    /// `Ok(None)` means the command name is unrecognized; the dispatcher
    /// ignores such envelopes. Malformed payloads and missing names are
    /// validation errors that reject the single command.
    pub fn parse(envelope: &CommandEnvelope) -> Result<Option<Self>, TransferError> {
        if envelope.msg_name.is_empty() {
            return Err(TransferError::InvalidMessageName);
        }

        let payload = envelope
            .payload
            .clone()
            .ok_or(TransferError::InvalidPayload)?;

        match envelope.msg_name.as_str() {
            PREPARE_TRANSFER_CMD => {
                let payload: PrepareTransferPayload =
                    serde_json::from_value(payload).map_err(|_| TransferError::InvalidPayload)?;
                if Decimal::from_str(&payload.amount).is_err() {
                    return Err(TransferError::InvalidPayload);
                }
                Ok(Some(TransferCommand::Prepare(payload)))
            }
            COMMIT_TRANSFER_FULFIL_CMD => {
                let payload: CommitTransferFulfilPayload =
                    serde_json::from_value(payload).map_err(|_| TransferError::InvalidPayload)?;
                Ok(Some(TransferCommand::Fulfil(payload)))
            }
            _ => Ok(None),
        }
    }
}
