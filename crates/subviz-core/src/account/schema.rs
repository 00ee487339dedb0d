//! Account-schema strategies for the two runtime generations.
//!
//! Runtimes before the account migration (Kusama runtime 1050) keep the nonce
//! in `System.AccountNonce` and the balances in `Balances.FreeBalance` and
//! `Balances.ReservedBalance`. Later runtimes expose a single
//! `System.Account` map. The generation is probed once per session by
//! [`probe_schema`], and the resolver talks to the chosen
//! [`AccountSchema`] without re-checking.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::address::AccountId;
use crate::error::CoreError;
use crate::rpc::{ChainRpc, Hasher, StorageKey};
use crate::types::{BalanceLock, BlockHash};

use super::codec::{decode_value, split_system_account, AccountData, LockV1, LockV2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Unified,
    Legacy,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unified => write!(f, "unified (System.Account)"),
            Self::Legacy => write!(f, "legacy (System.AccountNonce + Balances)"),
        }
    }
}

/// Nonce and balance fields of an account, before locks and block context
/// are attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountState {
    pub nonce: u64,
    pub free: u128,
    pub reserved: u128,
    pub misc_frozen: u128,
    pub fee_frozen: u128,
}

impl AccountState {
    fn with_data(nonce: u64, data: AccountData) -> Self {
        Self {
            nonce,
            free: data.free,
            reserved: data.reserved,
            misc_frozen: data.misc_frozen,
            fee_frozen: data.fee_frozen,
        }
    }
}

/// Staking storage items whose map hasher depends on the runtime generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakingItem {
    Bonded,
    Ledger,
    Payee,
    SlashingSpans,
}

impl StakingItem {
    fn name(&self) -> &'static str {
        match self {
            Self::Bonded => "Bonded",
            Self::Ledger => "Ledger",
            Self::Payee => "Payee",
            Self::SlashingSpans => "SlashingSpans",
        }
    }
}

/// Capability interface over one account-schema generation.
#[async_trait]
pub trait AccountSchema: Send + Sync {
    fn kind(&self) -> SchemaKind;

    /// Read nonce and balances. `Ok(None)` means the account data could not
    /// be resolved on this runtime.
    async fn read_account(
        &self,
        rpc: &dyn ChainRpc,
        at: &BlockHash,
        who: &AccountId,
    ) -> Result<Option<AccountState>, CoreError>;

    /// Read `Balances.Locks`. An empty slot is an empty lock list.
    async fn read_locks(
        &self,
        rpc: &dyn ChainRpc,
        at: &BlockHash,
        who: &AccountId,
    ) -> Result<Vec<BalanceLock>, CoreError>;

    /// Storage key of a staking map entry for `key`.
    fn staking_key(&self, item: StakingItem, key: &[u8; 32]) -> StorageKey;
}

// ==============================================================================
// Unified Schema
// ==============================================================================

/// `System.Account` holds `{nonce, .., data}` in one value.
#[derive(Debug, Default)]
pub struct UnifiedAccountSchema;

#[async_trait]
impl AccountSchema for UnifiedAccountSchema {
    fn kind(&self) -> SchemaKind {
        SchemaKind::Unified
    }

    async fn read_account(
        &self,
        rpc: &dyn ChainRpc,
        at: &BlockHash,
        who: &AccountId,
    ) -> Result<Option<AccountState>, CoreError> {
        let key = StorageKey::map("System", "Account", Hasher::Blake2_128Concat, who.key());
        let Some(bytes) = rpc.storage(&key, at).await? else {
            // Value-query default: an account that never existed is all zeros.
            return Ok(Some(AccountState::default()));
        };

        let (nonce, data) = split_system_account(&bytes)?;
        if let Some(data) = data {
            return Ok(Some(AccountState::with_data(u64::from(nonce), data)));
        }

        debug!(account = %who, "System.Account without data; reading Balances.Account");
        let key = StorageKey::map("Balances", "Account", Hasher::Blake2_128Concat, who.key());
        match rpc.storage(&key, at).await? {
            Some(bytes) => {
                let data = decode_value::<AccountData>(&bytes, "Balances.Account")?.normalized();
                Ok(Some(AccountState::with_data(u64::from(nonce), data)))
            }
            None => Ok(None),
        }
    }

    async fn read_locks(
        &self,
        rpc: &dyn ChainRpc,
        at: &BlockHash,
        who: &AccountId,
    ) -> Result<Vec<BalanceLock>, CoreError> {
        let key = StorageKey::map("Balances", "Locks", Hasher::Blake2_128Concat, who.key());
        match rpc.storage(&key, at).await? {
            Some(bytes) => Ok(decode_value::<Vec<LockV2>>(&bytes, "Balances.Locks")?
                .into_iter()
                .map(BalanceLock::from)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    fn staking_key(&self, item: StakingItem, key: &[u8; 32]) -> StorageKey {
        let hasher = match item {
            StakingItem::Ledger => Hasher::Blake2_128Concat,
            StakingItem::Bonded | StakingItem::Payee | StakingItem::SlashingSpans => {
                Hasher::Twox64Concat
            }
        };
        StorageKey::map("Staking", item.name(), hasher, key)
    }
}

// ==============================================================================
// Legacy Schema
// ==============================================================================

/// Nonce, free and reserved balance live in three separate maps.
#[derive(Debug, Default)]
pub struct LegacyAccountSchema;

impl LegacyAccountSchema {
    async fn read_u128(
        rpc: &dyn ChainRpc,
        at: &BlockHash,
        item: &str,
        who: &AccountId,
    ) -> Result<u128, CoreError> {
        let key = StorageKey::map("Balances", item, Hasher::Blake2_256, who.key());
        match rpc.storage(&key, at).await? {
            Some(bytes) => decode_value::<u128>(&bytes, item),
            None => Ok(0),
        }
    }

    async fn read_nonce(
        rpc: &dyn ChainRpc,
        at: &BlockHash,
        who: &AccountId,
    ) -> Result<u64, CoreError> {
        let key = StorageKey::map("System", "AccountNonce", Hasher::Blake2_256, who.key());
        match rpc.storage(&key, at).await? {
            Some(bytes) => decode_value::<u32>(&bytes, "System.AccountNonce").map(u64::from),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl AccountSchema for LegacyAccountSchema {
    fn kind(&self) -> SchemaKind {
        SchemaKind::Legacy
    }

    async fn read_account(
        &self,
        rpc: &dyn ChainRpc,
        at: &BlockHash,
        who: &AccountId,
    ) -> Result<Option<AccountState>, CoreError> {
        let (nonce, free, reserved) = futures::try_join!(
            Self::read_nonce(rpc, at, who),
            Self::read_u128(rpc, at, "FreeBalance", who),
            Self::read_u128(rpc, at, "ReservedBalance", who),
        )?;
        Ok(Some(AccountState {
            nonce,
            free,
            reserved,
            misc_frozen: 0,
            fee_frozen: 0,
        }))
    }

    async fn read_locks(
        &self,
        rpc: &dyn ChainRpc,
        at: &BlockHash,
        who: &AccountId,
    ) -> Result<Vec<BalanceLock>, CoreError> {
        let key = StorageKey::map("Balances", "Locks", Hasher::Blake2_256, who.key());
        match rpc.storage(&key, at).await? {
            Some(bytes) => Ok(decode_value::<Vec<LockV1>>(&bytes, "Balances.Locks")?
                .into_iter()
                .map(BalanceLock::from)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    fn staking_key(&self, item: StakingItem, key: &[u8; 32]) -> StorageKey {
        let hasher = match item {
            StakingItem::Bonded => Hasher::Twox64Concat,
            StakingItem::Ledger | StakingItem::Payee | StakingItem::SlashingSpans => {
                Hasher::Blake2_256
            }
        };
        StorageKey::map("Staking", item.name(), hasher, key)
    }
}

// ==============================================================================
// Probe
// ==============================================================================

/// Pick the schema by checking whether `System.Account` has any entries.
///
/// Every live chain has at least one funded account, so an empty
/// `System.Account` map means the runtime predates it.
pub async fn probe_schema(
    rpc: &dyn ChainRpc,
    at: &BlockHash,
) -> Result<Arc<dyn AccountSchema>, CoreError> {
    let prefix = StorageKey::prefix("System", "Account");
    let keys = rpc.storage_keys_paged(&prefix, 1, at).await?;
    let schema: Arc<dyn AccountSchema> = if keys.is_empty() {
        Arc::new(LegacyAccountSchema)
    } else {
        Arc::new(UnifiedAccountSchema)
    };
    debug!(schema = %schema.kind(), "account schema probed");
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::MockRpc;
    use crate::test_util::{account, unified_account_key};

    #[tokio::test]
    async fn probe_picks_unified_when_system_account_has_entries() {
        let who = account(1);
        let rpc = MockRpc::builder()
            .with_raw_storage(unified_account_key(&who), vec![0; 80])
            .build();
        let schema = probe_schema(&rpc, &rpc.best_hash()).await.unwrap();
        assert_eq!(schema.kind(), SchemaKind::Unified);
    }

    #[tokio::test]
    async fn probe_picks_legacy_on_empty_system_account() {
        let rpc = MockRpc::builder().build();
        let schema = probe_schema(&rpc, &rpc.best_hash()).await.unwrap();
        assert_eq!(schema.kind(), SchemaKind::Legacy);
    }

    #[test]
    fn staking_hashers_differ_by_generation() {
        let key = [3u8; 32];
        let unified = UnifiedAccountSchema.staking_key(StakingItem::Ledger, &key);
        let legacy = LegacyAccountSchema.staking_key(StakingItem::Ledger, &key);
        assert_ne!(unified, legacy);

        // Bonded uses twox_64_concat in both generations.
        assert_eq!(
            UnifiedAccountSchema.staking_key(StakingItem::Bonded, &key),
            LegacyAccountSchema.staking_key(StakingItem::Bonded, &key)
        );
    }

    #[tokio::test]
    async fn unified_missing_account_is_zero() {
        let rpc = MockRpc::builder().build();
        let state = UnifiedAccountSchema
            .read_account(&rpc, &rpc.best_hash(), &account(2))
            .await
            .unwrap();
        assert_eq!(state, Some(AccountState::default()));
    }
}
