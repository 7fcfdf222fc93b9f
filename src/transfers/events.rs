//! Outbound domain events.
//!
//! One terminal event per transfer per cycle: the happy-path events for
//! prepare and fulfil, the query response for terminal-state duplicates, and
//! one error kind per failure class.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ResolutionError;
use super::state::TransferState;
use super::types::{ExtensionList, Transfer};

/// Event payload kinds produced by the transfers core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload", rename_all_fields = "camelCase")]
pub enum TransferEvent {
    /// Reservation confirmed; echoes the prepare payload to the payee side
    TransferPrepared {
        transfer_id: String,
        payer_fsp_id: String,
        payee_fsp_id: String,
        amount: String,
        currency_code: String,
        ilp_packet: String,
        condition: String,
        expiration: i64,
        extension_list: Option<ExtensionList>,
    },

    /// Reservation committed
    TransferCommitted {
        transfer_id: String,
        fulfilment: String,
        completed_timestamp: i64,
        extension_list: Option<ExtensionList>,
        payer_fsp_id: String,
        payee_fsp_id: String,
        amount: String,
        currency_code: String,
        settlement_model: String,
    },

    /// Stored outcome for a prepare of an already-terminal transfer
    TransferQueryResponse {
        transfer_id: String,
        transfer_state: TransferState,
        fulfilment: Option<String>,
        completed_timestamp: Option<i64>,
        extension_list: Option<ExtensionList>,
    },

    // === Not-found failures ===
    TransferNotFound {
        transfer_id: String,
        error_description: String,
    },
    HubNotFound {
        transfer_id: String,
        error_description: String,
    },
    PayerParticipantNotFound {
        transfer_id: String,
        payer_fsp_id: String,
        error_description: String,
    },
    PayeeParticipantNotFound {
        transfer_id: String,
        payee_fsp_id: String,
        error_description: String,
    },
    HubAccountNotFound {
        transfer_id: String,
        error_description: String,
    },
    PayerPositionAccountNotFound {
        transfer_id: String,
        payer_fsp_id: String,
        error_description: String,
    },
    PayerLiquidityAccountNotFound {
        transfer_id: String,
        payer_fsp_id: String,
        error_description: String,
    },
    PayeePositionAccountNotFound {
        transfer_id: String,
        payee_fsp_id: String,
        error_description: String,
    },
    PayeeLiquidityAccountNotFound {
        transfer_id: String,
        payee_fsp_id: String,
        error_description: String,
    },

    // === Settlement failures ===
    SettlementModelNotFound {
        transfer_id: String,
        amount: String,
        payer_currency: String,
        payee_currency: String,
        error_description: String,
    },
    SettlementLookupFailed {
        transfer_id: String,
        amount: String,
        payer_currency: String,
        payee_currency: String,
        error_description: String,
    },

    // === Ledger-protocol failures ===
    LiquidityCheckFailed {
        transfer_id: String,
        payer_fsp_id: String,
        amount: String,
        currency_code: String,
        error_description: String,
    },
    CommitFailed {
        transfer_id: String,
        error_description: String,
    },

    // === Compensation / infrastructure failures ===
    CancelReservationFailed {
        transfer_id: String,
        error_description: String,
    },
    ParticipantLookupFailed {
        transfer_id: String,
        error_description: String,
    },
    TransferLookupFailed {
        transfer_id: String,
        error_description: String,
    },
}

impl TransferEvent {
    /// Event kind name, for logs and assertions.
    pub fn name(&self) -> &'static str {
        match self {
            TransferEvent::TransferPrepared { .. } => "TransferPrepared",
            TransferEvent::TransferCommitted { .. } => "TransferCommitted",
            TransferEvent::TransferQueryResponse { .. } => "TransferQueryResponse",
            TransferEvent::TransferNotFound { .. } => "TransferNotFound",
            TransferEvent::HubNotFound { .. } => "HubNotFound",
            TransferEvent::PayerParticipantNotFound { .. } => "PayerParticipantNotFound",
            TransferEvent::PayeeParticipantNotFound { .. } => "PayeeParticipantNotFound",
            TransferEvent::HubAccountNotFound { .. } => "HubAccountNotFound",
            TransferEvent::PayerPositionAccountNotFound { .. } => "PayerPositionAccountNotFound",
            TransferEvent::PayerLiquidityAccountNotFound { .. } => "PayerLiquidityAccountNotFound",
            TransferEvent::PayeePositionAccountNotFound { .. } => "PayeePositionAccountNotFound",
            TransferEvent::PayeeLiquidityAccountNotFound { .. } => "PayeeLiquidityAccountNotFound",
            TransferEvent::SettlementModelNotFound { .. } => "SettlementModelNotFound",
            TransferEvent::SettlementLookupFailed { .. } => "SettlementLookupFailed",
            TransferEvent::LiquidityCheckFailed { .. } => "LiquidityCheckFailed",
            TransferEvent::CommitFailed { .. } => "CommitFailed",
            TransferEvent::CancelReservationFailed { .. } => "CancelReservationFailed",
            TransferEvent::ParticipantLookupFailed { .. } => "ParticipantLookupFailed",
            TransferEvent::TransferLookupFailed { .. } => "TransferLookupFailed",
        }
    }

    /// Whether this event reports a failure.
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            TransferEvent::TransferPrepared { .. }
                | TransferEvent::TransferCommitted { .. }
                | TransferEvent::TransferQueryResponse { .. }
        )
    }

    /// Map a resolution failure onto its dedicated event kind.
    pub fn resolution_failure(transfer: &Transfer, err: &ResolutionError) -> Self {
        let transfer_id = transfer.transfer_id.clone();
        let error_description = err.to_string();

        match err {
            ResolutionError::HubNotFound(_) => TransferEvent::HubNotFound {
                transfer_id,
                error_description,
            },
            ResolutionError::PayerParticipantNotFound(_) => {
                TransferEvent::PayerParticipantNotFound {
                    transfer_id,
                    payer_fsp_id: transfer.payer_fsp_id.clone(),
                    error_description,
                }
            }
            ResolutionError::PayeeParticipantNotFound(_) => {
                TransferEvent::PayeeParticipantNotFound {
                    transfer_id,
                    payee_fsp_id: transfer.payee_fsp_id.clone(),
                    error_description,
                }
            }
            ResolutionError::HubAccountNotFound(_) => TransferEvent::HubAccountNotFound {
                transfer_id,
                error_description,
            },
            ResolutionError::PayerPositionAccountNotFound(_) => {
                TransferEvent::PayerPositionAccountNotFound {
                    transfer_id,
                    payer_fsp_id: transfer.payer_fsp_id.clone(),
                    error_description,
                }
            }
            ResolutionError::PayerLiquidityAccountNotFound(_) => {
                TransferEvent::PayerLiquidityAccountNotFound {
                    transfer_id,
                    payer_fsp_id: transfer.payer_fsp_id.clone(),
                    error_description,
                }
            }
            ResolutionError::PayeePositionAccountNotFound(_) => {
                TransferEvent::PayeePositionAccountNotFound {
                    transfer_id,
                    payee_fsp_id: transfer.payee_fsp_id.clone(),
                    error_description,
                }
            }
            ResolutionError::PayeeLiquidityAccountNotFound(_) => {
                TransferEvent::PayeeLiquidityAccountNotFound {
                    transfer_id,
                    payee_fsp_id: transfer.payee_fsp_id.clone(),
                    error_description,
                }
            }
            ResolutionError::Directory(_) => TransferEvent::ParticipantLookupFailed {
                transfer_id,
                error_description,
            },
        }
    }

    /// Stored-outcome response for a terminal-state duplicate prepare.
    pub fn query_response(transfer: &Transfer) -> Self {
        TransferEvent::TransferQueryResponse {
            transfer_id: transfer.transfer_id.clone(),
            transfer_state: transfer.transfer_state,
            fulfilment: transfer.fulfilment.clone(),
            completed_timestamp: transfer.completed_timestamp,
            extension_list: transfer.extension_list.clone(),
        }
    }
}

/// Published event: the payload plus the opaque routing token copied
/// verbatim from the triggering command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    #[serde(flatten)]
    pub event: TransferEvent,
    #[serde(default)]
    pub opaque_token: Option<Value>,
}

impl DomainEvent {
    pub fn new(event: TransferEvent, opaque_token: Option<Value>) -> Self {
        Self {
            event,
            opaque_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfers::types::prepare_hash;

    fn transfer() -> Transfer {
        Transfer::new(
            "t1".into(),
            "dfsp-a".into(),
            "dfsp-b".into(),
            "10".into(),
            "USD".into(),
            "pkt".into(),
            "cond".into(),
            1_700_000_000_000,
            None,
            "DEFAULT".into(),
            prepare_hash("t1", "dfsp-b", "dfsp-a", "10", 1_700_000_000_000),
        )
    }

    #[test]
    fn test_every_resolution_kind_has_its_own_event() {
        let transfer = transfer();
        let cases = [
            (ResolutionError::HubNotFound("hub".into()), "HubNotFound"),
            (
                ResolutionError::PayerParticipantNotFound("dfsp-a".into()),
                "PayerParticipantNotFound",
            ),
            (
                ResolutionError::PayeeParticipantNotFound("dfsp-b".into()),
                "PayeeParticipantNotFound",
            ),
            (
                ResolutionError::HubAccountNotFound("USD".into()),
                "HubAccountNotFound",
            ),
            (
                ResolutionError::PayerPositionAccountNotFound("USD".into()),
                "PayerPositionAccountNotFound",
            ),
            (
                ResolutionError::PayerLiquidityAccountNotFound("USD".into()),
                "PayerLiquidityAccountNotFound",
            ),
            (
                ResolutionError::PayeePositionAccountNotFound("USD".into()),
                "PayeePositionAccountNotFound",
            ),
            (
                ResolutionError::PayeeLiquidityAccountNotFound("USD".into()),
                "PayeeLiquidityAccountNotFound",
            ),
            (
                ResolutionError::Directory("timeout".into()),
                "ParticipantLookupFailed",
            ),
        ];

        for (err, expected) in cases {
            let event = TransferEvent::resolution_failure(&transfer, &err);
            assert_eq!(event.name(), expected);
            assert!(event.is_error());
        }
    }

    #[test]
    fn test_query_response_reflects_stored_outcome() {
        let mut transfer = transfer();
        transfer.transfer_state = TransferState::Committed;
        transfer.fulfilment = Some("abc".into());
        transfer.completed_timestamp = Some(1_700_000_001_000);

        match TransferEvent::query_response(&transfer) {
            TransferEvent::TransferQueryResponse {
                transfer_state,
                fulfilment,
                completed_timestamp,
                ..
            } => {
                assert_eq!(transfer_state, TransferState::Committed);
                assert_eq!(fulfilment.as_deref(), Some("abc"));
                assert_eq!(completed_timestamp, Some(1_700_000_001_000));
            }
            other => panic!("unexpected event {}", other.name()),
        }
    }

    #[test]
    fn test_event_serializes_with_name_tag() {
        let event = DomainEvent::new(
            TransferEvent::TransferNotFound {
                transfer_id: "t1".into(),
                error_description: "no transfer".into(),
            },
            Some(serde_json::json!({"requestId": "r-1"})),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["name"], "TransferNotFound");
        assert_eq!(json["payload"]["transferId"], "t1");
        assert_eq!(json["opaqueToken"]["requestId"], "r-1");
    }
}
