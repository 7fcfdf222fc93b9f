//! Per-cycle write-through transfer cache.
//!
//! Transfers touched during a processing cycle live here and are the source
//! of truth until the batch-end flush writes them back to the repository.

use std::collections::HashMap;

use tracing::debug;

use super::adapters::TransfersRepository;
use super::error::TransferError;
use super::types::Transfer;

/// Write-through store of transfers touched during the current cycle.
#[derive(Debug, Default)]
pub struct TransferCache {
    entries: HashMap<String, Transfer>,
}

impl TransferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached transfer.
    pub fn get(&self, transfer_id: &str) -> Option<Transfer> {
        self.entries.get(transfer_id).cloned()
    }

    /// Insert or replace a transfer.
    pub fn put(&mut self, transfer: Transfer) {
        self.entries.insert(transfer.transfer_id.clone(), transfer);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write all touched transfers to the repository and clear the cache.
    ///
    /// Runs at the end of every cycle, including after a mid-cycle error.
    pub async fn flush(&mut self, repository: &dyn TransfersRepository) -> Result<(), TransferError> {
        if self.entries.is_empty() {
            return Ok(());
        }

        let transfers: Vec<Transfer> = self.entries.drain().map(|(_, t)| t).collect();
        debug!(count = transfers.len(), "flushing transfer cache");
        repository.store_transfers(transfers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfers::adapters::{InMemoryTransfersRepository, TransfersRepository};
    use crate::transfers::state::TransferState;
    use crate::transfers::types::prepare_hash;

    fn transfer(id: &str) -> Transfer {
        Transfer::new(
            id.into(),
            "dfsp-a".into(),
            "dfsp-b".into(),
            "10".into(),
            "USD".into(),
            "pkt".into(),
            "cond".into(),
            1_700_000_000_000,
            None,
            "DEFAULT".into(),
            prepare_hash(id, "dfsp-b", "dfsp-a", "10", 1_700_000_000_000),
        )
    }

    #[test]
    fn test_put_get_and_overwrite() {
        let mut cache = TransferCache::new();
        assert!(cache.get("t1").is_none());

        cache.put(transfer("t1"));
        assert_eq!(cache.get("t1").unwrap().transfer_state, TransferState::Received);

        let mut updated = transfer("t1");
        updated.transfer_state = TransferState::Reserved;
        cache.put(updated);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("t1").unwrap().transfer_state, TransferState::Reserved);
    }

    #[tokio::test]
    async fn test_flush_stores_and_clears() {
        let repository = InMemoryTransfersRepository::new();
        let mut cache = TransferCache::new();
        cache.put(transfer("t1"));
        cache.put(transfer("t2"));

        cache.flush(&repository).await.unwrap();

        assert!(cache.is_empty());
        assert!(repository.get_transfer_by_id("t1").await.unwrap().is_some());
        assert!(repository.get_transfer_by_id("t2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_flush_on_empty_cache_is_a_noop() {
        let repository = InMemoryTransfersRepository::new();
        let mut cache = TransferCache::new();

        cache.flush(&repository).await.unwrap();
        assert!(repository.get_transfers().await.unwrap().is_empty());
    }
}
