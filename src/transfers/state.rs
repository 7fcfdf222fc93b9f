//! Transfer lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transfer lifecycle states.
///
/// Terminal states: COMMITTED, REJECTED, ABORTED. ABORTED is never produced
/// here; it is assigned by external operators and only recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferState {
    /// Prepare accepted, reservation not yet confirmed
    Received,

    /// Funds reserved on the ledger, awaiting fulfilment
    Reserved,

    /// Terminal: reservation committed
    Committed,

    /// Terminal: reservation cancelled or commit refused
    Rejected,

    /// Terminal: aborted outside this core
    Aborted,
}

impl TransferState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Committed | TransferState::Rejected | TransferState::Aborted
        )
    }

    /// Check if the transfer is still in flight (duplicate prepares are ignored)
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TransferState::Received | TransferState::Reserved)
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Received => "RECEIVED",
            TransferState::Reserved => "RESERVED",
            TransferState::Committed => "COMMITTED",
            TransferState::Rejected => "REJECTED",
            TransferState::Aborted => "ABORTED",
        }
    }

    /// Parse a state name as used on the wire and in admin queries
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RECEIVED" => Some(TransferState::Received),
            "RESERVED" => Some(TransferState::Reserved),
            "COMMITTED" => Some(TransferState::Committed),
            "REJECTED" => Some(TransferState::Rejected),
            "ABORTED" => Some(TransferState::Aborted),
            _ => None,
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Committed.is_terminal());
        assert!(TransferState::Rejected.is_terminal());
        assert!(TransferState::Aborted.is_terminal());

        assert!(!TransferState::Received.is_terminal());
        assert!(!TransferState::Reserved.is_terminal());
    }

    #[test]
    fn test_in_flight_states() {
        assert!(TransferState::Received.is_in_flight());
        assert!(TransferState::Reserved.is_in_flight());

        assert!(!TransferState::Committed.is_in_flight());
        assert!(!TransferState::Rejected.is_in_flight());
        assert!(!TransferState::Aborted.is_in_flight());
    }

    #[test]
    fn test_name_roundtrip() {
        let states = [
            TransferState::Received,
            TransferState::Reserved,
            TransferState::Committed,
            TransferState::Rejected,
            TransferState::Aborted,
        ];

        for state in states {
            assert_eq!(TransferState::from_name(state.as_str()), Some(state));
        }

        assert_eq!(TransferState::from_name("SETTLED"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferState::Received.to_string(), "RECEIVED");
        assert_eq!(TransferState::Committed.to_string(), "COMMITTED");
    }
}
