//! Account state resolution across runtime generations.
//!
//! [`AccountStateResolver`] answers balance and staking questions for an
//! address at a block. The storage layout it reads is delegated to the
//! [`AccountSchema`] picked for the session, so callers never see which
//! runtime generation the node runs.

mod codec;
pub mod schema;

pub use codec::{
    AccountData, AccountInfo, AccountInfoWithoutData, LockV1, LockV2, RewardDestinationRaw,
    SlashingSpansRaw, StakingLedgerRaw, UnlockChunkRaw,
};
pub use schema::{
    probe_schema, AccountSchema, AccountState, LegacyAccountSchema, SchemaKind, StakingItem,
    UnifiedAccountSchema,
};

use std::sync::Arc;

use tracing::debug;

use crate::address::AccountId;
use crate::connection::Session;
use crate::error::CoreError;
use crate::rpc::ChainRpc;
use crate::types::{AccountBalance, AccountStaking, BlockHash, BlockRef, StakingLedger};

use codec::decode_value;

pub struct AccountStateResolver {
    rpc: Arc<dyn ChainRpc>,
    schema: Arc<dyn AccountSchema>,
}

impl AccountStateResolver {
    pub fn new(session: &Session) -> Self {
        Self::with_schema(session.rpc(), session.schema())
    }

    pub fn with_schema(rpc: Arc<dyn ChainRpc>, schema: Arc<dyn AccountSchema>) -> Self {
        Self { rpc, schema }
    }

    /// Balance snapshot of `address` at block `at`.
    ///
    /// The header, the account read and the locks read are issued together
    /// and joined; the snapshot carries the block they were resolved at.
    pub async fn fetch_balance(
        &self,
        at: &BlockHash,
        address: &str,
    ) -> Result<AccountBalance, CoreError> {
        let who: AccountId = address.parse()?;
        let rpc = self.rpc.as_ref();

        let (header, state, locks) = futures::try_join!(
            rpc.header(at),
            self.schema.read_account(rpc, at, &who),
            self.schema.read_locks(rpc, at, &who),
        )?;

        let at = BlockRef {
            hash: *at,
            height: header.number,
        };
        let state = state.ok_or_else(|| CoreError::AccountNotFound {
            address: address.to_owned(),
            at,
        })?;

        Ok(AccountBalance {
            at,
            nonce: state.nonce,
            free: state.free,
            reserved: state.reserved,
            misc_frozen: state.misc_frozen,
            fee_frozen: state.fee_frozen,
            locks,
        })
    }

    /// Balance snapshot of `address` at the current best block.
    pub async fn fetch_current_balance(&self, address: &str) -> Result<AccountBalance, CoreError> {
        let tip = self.rpc.block_hash(None).await?;
        self.fetch_balance(&tip, address).await
    }

    /// Staking snapshot of `stash` at block `at`, or `None` when the
    /// address is not a bonded stash.
    ///
    /// A bonded stash whose controller has no staking ledger violates a
    /// chain invariant and fails with `CorruptChainState`.
    pub async fn fetch_staking_info(
        &self,
        at: &BlockHash,
        stash: &str,
    ) -> Result<Option<AccountStaking>, CoreError> {
        let stash_id: AccountId = stash.parse()?;
        let rpc = self.rpc.as_ref();

        let bonded_key = self.schema.staking_key(StakingItem::Bonded, stash_id.key());
        let (header, bonded) = futures::try_join!(rpc.header(at), rpc.storage(&bonded_key, at))?;
        let at_ref = BlockRef {
            hash: *at,
            height: header.number,
        };

        let Some(bonded) = bonded else {
            debug!(stash, "not a bonded stash");
            return Ok(None);
        };
        let controller = stash_id.sibling(decode_value::<[u8; 32]>(&bonded, "Staking.Bonded")?);

        let ledger_key = self.schema.staking_key(StakingItem::Ledger, controller.key());
        let payee_key = self.schema.staking_key(StakingItem::Payee, stash_id.key());
        let spans_key = self
            .schema
            .staking_key(StakingItem::SlashingSpans, stash_id.key());
        let (ledger, payee, spans) = futures::try_join!(
            rpc.storage(&ledger_key, at),
            rpc.storage(&payee_key, at),
            rpc.storage(&spans_key, at),
        )?;

        let ledger = ledger.ok_or_else(|| {
            CoreError::CorruptChainState(format!(
                "staking ledger could not be found for controller `{controller}` of bonded stash `{stash}`"
            ))
        })?;
        let ledger = decode_value::<StakingLedgerRaw>(&ledger, "Staking.Ledger")?;

        let reward_destination = match payee {
            Some(bytes) => decode_value::<RewardDestinationRaw>(&bytes, "Staking.Payee")?,
            None => RewardDestinationRaw::default(),
        }
        .into_destination(|key| stash_id.sibling(key).to_ss58());

        let num_slashing_spans = match spans {
            Some(bytes) => decode_value::<SlashingSpansRaw>(&bytes, "Staking.SlashingSpans")?.count(),
            None => 0,
        };

        Ok(Some(AccountStaking {
            at: at_ref,
            controller: controller.to_ss58(),
            reward_destination,
            num_slashing_spans,
            staking: StakingLedger {
                stash: stash_id.sibling(ledger.stash).to_ss58(),
                total: ledger.total.0,
                active: ledger.active.0,
                unlocking: ledger.unlocking(),
            },
        }))
    }
}
