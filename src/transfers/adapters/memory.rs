//! In-memory transfers repository.
//!
//! Default store for development and tests; production deployments plug a
//! database-backed implementation into the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{TransferSearchFilter, TransfersRepository};
use crate::transfers::error::TransferError;
use crate::transfers::types::Transfer;

/// Map-backed repository keyed by transfer id.
#[derive(Debug, Default)]
pub struct InMemoryTransfersRepository {
    transfers: RwLock<HashMap<String, Transfer>>,
}

impl InMemoryTransfersRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(filter: &TransferSearchFilter, transfer: &Transfer) -> bool {
    if let Some(id) = &filter.id
        && transfer.transfer_id != *id
    {
        return false;
    }
    if let Some(state) = filter.state
        && transfer.transfer_state != state
    {
        return false;
    }
    if let Some(currency) = &filter.currency_code
        && transfer.currency_code != *currency
    {
        return false;
    }
    if let Some(start) = filter.start_date
        && transfer.created_at < start
    {
        return false;
    }
    if let Some(end) = filter.end_date
        && transfer.created_at > end
    {
        return false;
    }
    true
}

#[async_trait]
impl TransfersRepository for InMemoryTransfersRepository {
    async fn get_transfer_by_id(
        &self,
        transfer_id: &str,
    ) -> Result<Option<Transfer>, TransferError> {
        Ok(self.transfers.read().await.get(transfer_id).cloned())
    }

    async fn get_transfers(&self) -> Result<Vec<Transfer>, TransferError> {
        let mut all: Vec<Transfer> = self.transfers.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn search_transfers(
        &self,
        filter: &TransferSearchFilter,
    ) -> Result<Vec<Transfer>, TransferError> {
        let mut found: Vec<Transfer> = self
            .transfers
            .read()
            .await
            .values()
            .filter(|t| matches(filter, t))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn store_transfers(&self, transfers: Vec<Transfer>) -> Result<(), TransferError> {
        if transfers.is_empty() {
            return Ok(());
        }

        let mut store = self.transfers.write().await;
        for transfer in transfers {
            store.insert(transfer.transfer_id.clone(), transfer);
        }
        Ok(())
    }

    async fn update_transfer(&self, transfer: &Transfer) -> Result<(), TransferError> {
        self.transfers
            .write()
            .await
            .insert(transfer.transfer_id.clone(), transfer.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfers::state::TransferState;
    use crate::transfers::types::prepare_hash;

    fn transfer(id: &str, currency: &str) -> Transfer {
        Transfer::new(
            id.into(),
            "dfsp-a".into(),
            "dfsp-b".into(),
            "10".into(),
            currency.into(),
            "pkt".into(),
            "cond".into(),
            1_700_000_000_000,
            None,
            "DEFAULT".into(),
            prepare_hash(id, "dfsp-b", "dfsp-a", "10", 1_700_000_000_000),
        )
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let repository = InMemoryTransfersRepository::new();
        repository
            .store_transfers(vec![transfer("t1", "USD")])
            .await
            .unwrap();

        let found = repository.get_transfer_by_id("t1").await.unwrap().unwrap();
        assert_eq!(found.transfer_id, "t1");
        assert!(repository.get_transfer_by_id("t9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_empty_list_is_safe() {
        let repository = InMemoryTransfersRepository::new();
        repository.store_transfers(Vec::new()).await.unwrap();
        assert!(repository.get_transfers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_overwrites() {
        let repository = InMemoryTransfersRepository::new();
        let mut t = transfer("t1", "USD");
        repository.store_transfers(vec![t.clone()]).await.unwrap();

        t.transfer_state = TransferState::Rejected;
        repository.update_transfer(&t).await.unwrap();

        let found = repository.get_transfer_by_id("t1").await.unwrap().unwrap();
        assert_eq!(found.transfer_state, TransferState::Rejected);
    }

    #[tokio::test]
    async fn test_search_filters_conjunctively() {
        let repository = InMemoryTransfersRepository::new();
        let mut committed = transfer("t1", "USD");
        committed.transfer_state = TransferState::Committed;
        repository
            .store_transfers(vec![committed, transfer("t2", "USD"), transfer("t3", "EUR")])
            .await
            .unwrap();

        let filter = TransferSearchFilter {
            currency_code: Some("USD".into()),
            ..Default::default()
        };
        assert_eq!(repository.search_transfers(&filter).await.unwrap().len(), 2);

        let filter = TransferSearchFilter {
            currency_code: Some("USD".into()),
            state: Some(TransferState::Committed),
            ..Default::default()
        };
        let found = repository.search_transfers(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].transfer_id, "t1");

        let filter = TransferSearchFilter {
            id: Some("t3".into()),
            ..Default::default()
        };
        assert_eq!(repository.search_transfers(&filter).await.unwrap().len(), 1);

        let filter = TransferSearchFilter {
            end_date: Some(0),
            ..Default::default()
        };
        assert!(repository.search_transfers(&filter).await.unwrap().is_empty());
    }
}
