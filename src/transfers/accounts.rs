//! Participant and account resolution.
//!
//! Every transfer needs the hub plus both counterparties, and within those
//! the five currency-specific ledger accounts. Participant records come from
//! the external directory through a short-lived read-through cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use super::adapters::ParticipantDirectory;
use super::error::ResolutionError;
use super::types::{AccountType, HUB_PARTICIPANT_ID, Participant, ParticipantAccount, Transfer};

/// Hub, payer and payee records for one transfer.
#[derive(Debug, Clone)]
pub struct TransferParticipants {
    pub hub: Participant,
    pub payer: Participant,
    pub payee: Participant,
}

/// The five ledger accounts a transfer touches.
#[derive(Debug, Clone)]
pub struct TransferAccounts {
    pub hub: ParticipantAccount,
    pub payer_position: ParticipantAccount,
    pub payer_liquidity: ParticipantAccount,
    pub payee_position: ParticipantAccount,
    pub payee_liquidity: ParticipantAccount,
}

/// Resolver cache tuning.
#[derive(Debug, Clone)]
pub struct AccountResolverConfig {
    /// Entries older than this are refetched on read
    pub cache_ttl: Duration,
    /// Upper bound on cached participants
    pub cache_capacity: usize,
}

impl Default for AccountResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            cache_capacity: 512,
        }
    }
}

struct CachedParticipant {
    participant: Participant,
    fetched_at: Instant,
}

/// Read-through participant resolver with a bounded, TTL-checked cache.
///
/// The cache is a mirror of the directory; nothing is ever written back.
pub struct AccountResolver {
    directory: Arc<dyn ParticipantDirectory>,
    cache: HashMap<String, CachedParticipant>,
    config: AccountResolverConfig,
}

impl AccountResolver {
    pub fn new(directory: Arc<dyn ParticipantDirectory>, config: AccountResolverConfig) -> Self {
        Self {
            directory,
            cache: HashMap::new(),
            config,
        }
    }

    /// Resolve the hub and both counterparties of a transfer.
    pub async fn resolve_participants(
        &mut self,
        payer_fsp_id: &str,
        payee_fsp_id: &str,
        transfer_id: &str,
    ) -> Result<TransferParticipants, ResolutionError> {
        let hub = match self.lookup(HUB_PARTICIPANT_ID).await? {
            Some(p) => p,
            None => {
                error!(transfer_id = %transfer_id, "hub participant missing");
                return Err(ResolutionError::HubNotFound(HUB_PARTICIPANT_ID.to_string()));
            }
        };

        let payer = match self.lookup(payer_fsp_id).await? {
            Some(p) => p,
            None => {
                error!(transfer_id = %transfer_id, payer_fsp_id = %payer_fsp_id, "payer participant missing");
                return Err(ResolutionError::PayerParticipantNotFound(
                    payer_fsp_id.to_string(),
                ));
            }
        };

        let payee = match self.lookup(payee_fsp_id).await? {
            Some(p) => p,
            None => {
                error!(transfer_id = %transfer_id, payee_fsp_id = %payee_fsp_id, "payee participant missing");
                return Err(ResolutionError::PayeeParticipantNotFound(
                    payee_fsp_id.to_string(),
                ));
            }
        };

        Ok(TransferParticipants { hub, payer, payee })
    }

    /// Resolve the five currency-specific accounts for one transfer.
    ///
    /// First missing account determines the reported kind.
    pub fn resolve_accounts(
        &self,
        participants: &TransferParticipants,
        transfer: &Transfer,
    ) -> Result<TransferAccounts, ResolutionError> {
        let currency = transfer.currency_code.as_str();

        let hub = participants
            .hub
            .account(AccountType::Hub, currency)
            .ok_or_else(|| ResolutionError::HubAccountNotFound(currency.to_string()))?;

        let payer_position = participants
            .payer
            .account(AccountType::Position, currency)
            .ok_or_else(|| ResolutionError::PayerPositionAccountNotFound(currency.to_string()))?;

        let payer_liquidity = participants
            .payer
            .account(AccountType::Settlement, currency)
            .ok_or_else(|| ResolutionError::PayerLiquidityAccountNotFound(currency.to_string()))?;

        let payee_position = participants
            .payee
            .account(AccountType::Position, currency)
            .ok_or_else(|| ResolutionError::PayeePositionAccountNotFound(currency.to_string()))?;

        let payee_liquidity = participants
            .payee
            .account(AccountType::Settlement, currency)
            .ok_or_else(|| ResolutionError::PayeeLiquidityAccountNotFound(currency.to_string()))?;

        Ok(TransferAccounts {
            hub: hub.clone(),
            payer_position: payer_position.clone(),
            payer_liquidity: payer_liquidity.clone(),
            payee_position: payee_position.clone(),
            payee_liquidity: payee_liquidity.clone(),
        })
    }

    async fn lookup(&mut self, participant_id: &str) -> Result<Option<Participant>, ResolutionError> {
        if let Some(entry) = self.cache.get(participant_id) {
            if entry.fetched_at.elapsed() <= self.config.cache_ttl {
                return Ok(Some(entry.participant.clone()));
            }
            debug!(participant_id = %participant_id, "participant cache entry expired");
            self.cache.remove(participant_id);
        }

        let participant = self
            .directory
            .get_participant_info(participant_id)
            .await
            .map_err(|e| ResolutionError::Directory(e.to_string()))?;

        if let Some(participant) = &participant {
            if self.cache.len() >= self.config.cache_capacity {
                let ttl = self.config.cache_ttl;
                self.cache.retain(|_, e| e.fetched_at.elapsed() <= ttl);
            }
            if self.cache.len() < self.config.cache_capacity {
                self.cache.insert(
                    participant_id.to_string(),
                    CachedParticipant {
                        participant: participant.clone(),
                        fetched_at: Instant::now(),
                    },
                );
            }
        }

        Ok(participant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfers::adapters::mock::{MockDirectory, fsp_participant, hub_participant};
    use crate::transfers::types::prepare_hash;

    fn transfer(currency: &str) -> Transfer {
        Transfer::new(
            "t1".into(),
            "dfsp-a".into(),
            "dfsp-b".into(),
            "10".into(),
            currency.into(),
            "pkt".into(),
            "cond".into(),
            1_700_000_000_000,
            None,
            "DEFAULT".into(),
            prepare_hash("t1", "dfsp-b", "dfsp-a", "10", 1_700_000_000_000),
        )
    }

    fn seeded_directory() -> Arc<MockDirectory> {
        let directory = MockDirectory::new();
        directory.insert(hub_participant("USD"));
        directory.insert(fsp_participant("dfsp-a", "USD"));
        directory.insert(fsp_participant("dfsp-b", "USD"));
        Arc::new(directory)
    }

    fn resolver(directory: Arc<MockDirectory>) -> AccountResolver {
        AccountResolver::new(directory, AccountResolverConfig::default())
    }

    #[tokio::test]
    async fn test_resolves_all_three_participants() {
        let directory = seeded_directory();
        let mut resolver = resolver(directory);

        let participants = resolver
            .resolve_participants("dfsp-a", "dfsp-b", "t1")
            .await
            .unwrap();

        assert_eq!(participants.hub.id, HUB_PARTICIPANT_ID);
        assert_eq!(participants.payer.id, "dfsp-a");
        assert_eq!(participants.payee.id, "dfsp-b");
    }

    #[tokio::test]
    async fn test_missing_participants_report_distinct_kinds() {
        let directory = seeded_directory();
        directory.remove("dfsp-b");
        let mut resolver = resolver(directory.clone());

        let err = resolver
            .resolve_participants("dfsp-a", "dfsp-b", "t1")
            .await
            .unwrap_err();
        assert_eq!(err, ResolutionError::PayeeParticipantNotFound("dfsp-b".into()));

        directory.remove(HUB_PARTICIPANT_ID);
        let mut resolver = AccountResolver::new(directory, AccountResolverConfig::default());
        let err = resolver
            .resolve_participants("dfsp-a", "dfsp-b", "t1")
            .await
            .unwrap_err();
        assert_eq!(err, ResolutionError::HubNotFound("hub".into()));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_directory() {
        let directory = seeded_directory();
        let mut resolver = resolver(directory.clone());

        resolver
            .resolve_participants("dfsp-a", "dfsp-b", "t1")
            .await
            .unwrap();
        let calls_after_first = directory.call_count();

        resolver
            .resolve_participants("dfsp-a", "dfsp-b", "t1")
            .await
            .unwrap();
        assert_eq!(directory.call_count(), calls_after_first);
    }

    #[tokio::test]
    async fn test_ttl_expiry_triggers_refetch() {
        let directory = seeded_directory();
        let mut resolver = AccountResolver::new(
            directory.clone(),
            AccountResolverConfig {
                cache_ttl: Duration::from_millis(0),
                cache_capacity: 512,
            },
        );

        resolver
            .resolve_participants("dfsp-a", "dfsp-b", "t1")
            .await
            .unwrap();
        let calls_after_first = directory.call_count();

        resolver
            .resolve_participants("dfsp-a", "dfsp-b", "t1")
            .await
            .unwrap();
        assert!(directory.call_count() > calls_after_first);
    }

    #[tokio::test]
    async fn test_each_missing_account_reports_its_own_kind() {
        let directory = seeded_directory();
        let mut resolver = resolver(directory);
        let participants = resolver
            .resolve_participants("dfsp-a", "dfsp-b", "t1")
            .await
            .unwrap();

        // All five accounts exist for USD.
        assert!(resolver.resolve_accounts(&participants, &transfer("USD")).is_ok());

        // No participant has EUR accounts: the hub account is checked first.
        let err = resolver
            .resolve_accounts(&participants, &transfer("EUR"))
            .unwrap_err();
        assert_eq!(err, ResolutionError::HubAccountNotFound("EUR".into()));

        // Knock accounts out one by one to surface each kind.
        let mut stripped = participants.clone();
        stripped.payer.accounts.retain(|a| a.account_type != AccountType::Position);
        let err = resolver
            .resolve_accounts(&stripped, &transfer("USD"))
            .unwrap_err();
        assert_eq!(err, ResolutionError::PayerPositionAccountNotFound("USD".into()));

        let mut stripped = participants.clone();
        stripped.payer.accounts.retain(|a| a.account_type != AccountType::Settlement);
        let err = resolver
            .resolve_accounts(&stripped, &transfer("USD"))
            .unwrap_err();
        assert_eq!(err, ResolutionError::PayerLiquidityAccountNotFound("USD".into()));

        let mut stripped = participants.clone();
        stripped.payee.accounts.retain(|a| a.account_type != AccountType::Position);
        let err = resolver
            .resolve_accounts(&stripped, &transfer("USD"))
            .unwrap_err();
        assert_eq!(err, ResolutionError::PayeePositionAccountNotFound("USD".into()));

        let mut stripped = participants.clone();
        stripped.payee.accounts.retain(|a| a.account_type != AccountType::Settlement);
        let err = resolver
            .resolve_accounts(&stripped, &transfer("USD"))
            .unwrap_err();
        assert_eq!(err, ResolutionError::PayeeLiquidityAccountNotFound("USD".into()));
    }
}
