//! Core domain types: transfers, participants, accounts.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::state::TransferState;

/// Well-known id of the switch-operator participant.
pub const HUB_PARTICIPANT_ID: &str = "hub";

// ============================================================================
// Extensions
// ============================================================================

/// Single key/value extension carried through prepare and fulfil payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionItem {
    pub key: String,
    pub value: String,
}

/// Extension list wrapper as carried on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionList {
    pub extension: Vec<ExtensionItem>,
}

// ============================================================================
// Participants
// ============================================================================

/// Ledger account classes owned by a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Switch-operator bookkeeping account
    Hub,
    /// Net exposure account
    Position,
    /// Funding/liquidity account
    Settlement,
}

/// One ledger account owned by a participant, tagged by type and currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantAccount {
    pub id: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub currency_code: String,
}

/// Participant record as served by the external directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub accounts: Vec<ParticipantAccount>,
}

impl Participant {
    /// Find the unique account matching `(type, currency)` in this
    /// participant's account set.
    pub fn account(&self, account_type: AccountType, currency_code: &str) -> Option<&ParticipantAccount> {
        self.accounts
            .iter()
            .find(|a| a.account_type == account_type && a.currency_code == currency_code)
    }
}

// ============================================================================
// Transfer
// ============================================================================

/// Transfer aggregate record.
///
/// `transfer_id` is immutable once assigned. The prepare-time payload fields
/// (payer/payee, amount, currency, ilp packet, condition, expiration) never
/// change after construction; the fulfil-time fields stay `None` until commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub transfer_id: String,
    pub payer_fsp_id: String,
    pub payee_fsp_id: String,
    pub amount: String,
    pub currency_code: String,
    pub ilp_packet: String,
    pub condition: String,
    /// Expiration of the prepare request (epoch millis)
    pub expiration_timestamp: i64,
    pub transfer_state: TransferState,
    /// Content hash of the immutable prepare fields, for duplicate detection
    pub hash: String,
    pub fulfilment: Option<String>,
    pub completed_timestamp: Option<i64>,
    pub extension_list: Option<ExtensionList>,
    pub settlement_model: String,
    pub error_information: Option<String>,
    /// Created timestamp (epoch millis)
    pub created_at: i64,
    /// Last updated timestamp (epoch millis)
    pub updated_at: i64,
}

impl Transfer {
    /// Create a new transfer in RECEIVED state from a prepare payload.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transfer_id: String,
        payer_fsp_id: String,
        payee_fsp_id: String,
        amount: String,
        currency_code: String,
        ilp_packet: String,
        condition: String,
        expiration_timestamp: i64,
        extension_list: Option<ExtensionList>,
        settlement_model: String,
        hash: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();

        Self {
            transfer_id,
            payer_fsp_id,
            payee_fsp_id,
            amount,
            currency_code,
            ilp_packet,
            condition,
            expiration_timestamp,
            transfer_state: TransferState::Received,
            hash,
            fulfilment: None,
            completed_timestamp: None,
            extension_list,
            settlement_model,
            error_information: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the last-modified timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer[{}] {} -> {} amount={} {} state={}",
            self.transfer_id,
            self.payer_fsp_id,
            self.payee_fsp_id,
            self.amount,
            self.currency_code,
            self.transfer_state
        )
    }
}

// ============================================================================
// Prepare-payload hashing
// ============================================================================

/// Field tuple covered by the duplicate-detection digest. Serialization order
/// is the struct declaration order and must not change.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrepareDigest<'a> {
    transfer_id: &'a str,
    payee_fsp_id: &'a str,
    payer_fsp_id: &'a str,
    amount: &'a str,
    expiration_timestamp: i64,
}

/// Compute the duplicate-detection hash for a prepare request.
///
/// SHA-256 over the canonical JSON of the immutable prepare fields, base64
/// encoded with trailing `=` padding stripped.
pub fn prepare_hash(
    transfer_id: &str,
    payee_fsp_id: &str,
    payer_fsp_id: &str,
    amount: &str,
    expiration_timestamp: i64,
) -> String {
    let digest = PrepareDigest {
        transfer_id,
        payee_fsp_id,
        payer_fsp_id,
        amount,
        expiration_timestamp,
    };

    let json = serde_json::to_vec(&digest).expect("prepare digest serializes infallibly");
    let encoded = BASE64.encode(Sha256::digest(&json));
    encoded.trim_end_matches('=').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hash() -> String {
        prepare_hash("t1", "dfsp-b", "dfsp-a", "10", 1_700_000_000_000)
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(sample_hash(), sample_hash());
    }

    #[test]
    fn test_hash_changes_with_any_field() {
        let base = sample_hash();

        assert_ne!(base, prepare_hash("t2", "dfsp-b", "dfsp-a", "10", 1_700_000_000_000));
        assert_ne!(base, prepare_hash("t1", "dfsp-c", "dfsp-a", "10", 1_700_000_000_000));
        assert_ne!(base, prepare_hash("t1", "dfsp-b", "dfsp-x", "10", 1_700_000_000_000));
        assert_ne!(base, prepare_hash("t1", "dfsp-b", "dfsp-a", "10.00", 1_700_000_000_000));
        assert_ne!(base, prepare_hash("t1", "dfsp-b", "dfsp-a", "10", 1_700_000_000_001));
    }

    #[test]
    fn test_hash_has_no_padding() {
        assert!(!sample_hash().ends_with('='));
    }

    #[test]
    fn test_account_lookup_matches_type_and_currency() {
        let participant = Participant {
            id: "dfsp-a".into(),
            name: "DFSP A".into(),
            is_active: true,
            accounts: vec![
                ParticipantAccount {
                    id: "a-pos-usd".into(),
                    account_type: AccountType::Position,
                    currency_code: "USD".into(),
                },
                ParticipantAccount {
                    id: "a-liq-usd".into(),
                    account_type: AccountType::Settlement,
                    currency_code: "USD".into(),
                },
                ParticipantAccount {
                    id: "a-pos-eur".into(),
                    account_type: AccountType::Position,
                    currency_code: "EUR".into(),
                },
            ],
        };

        let found = participant.account(AccountType::Position, "USD").unwrap();
        assert_eq!(found.id, "a-pos-usd");

        assert!(participant.account(AccountType::Hub, "USD").is_none());
        assert!(participant.account(AccountType::Settlement, "EUR").is_none());
    }

    #[test]
    fn test_new_transfer_starts_received() {
        let transfer = Transfer::new(
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
            sample_hash(),
        );

        assert_eq!(transfer.transfer_state, TransferState::Received);
        assert!(transfer.fulfilment.is_none());
        assert!(transfer.completed_timestamp.is_none());
        assert_eq!(transfer.created_at, transfer.updated_at);
    }
}
