//! Shared test helpers for `subviz-core` unit tests.
//!
//! Builders for deterministic accounts, the storage keys and values a
//! unified runtime would serve for them, and ledger records, so tests
//! across modules construct dummy chain data the same way.

use crate::account::{AccountData, AccountInfo};
use crate::address::AccountId;
use crate::rpc::{Hasher, StorageKey};
use crate::types::{BlockHeight, TransactionRecord};

// ==============================================================================
// Accounts
// ==============================================================================

/// A deterministic account whose public key is `[n; 32]`, encoded with the
/// generic substrate prefix.
pub fn account(n: u8) -> AccountId {
    AccountId::new([n; 32], 42)
}

/// `System.Account` key of `who` on a unified runtime.
pub fn unified_account_key(who: &AccountId) -> StorageKey {
    StorageKey::map("System", "Account", Hasher::Blake2_128Concat, who.key())
}

/// A `System.Account` value with the given nonce and balances.
pub fn unified_account_info(nonce: u32, free: u128, reserved: u128) -> AccountInfo {
    AccountInfo {
        nonce,
        consumers: 0,
        providers: 1,
        sufficients: 0,
        data: AccountData {
            free,
            reserved,
            misc_frozen: 0,
            fee_frozen: 0,
        },
    }
}

// ==============================================================================
// Ledger Records
// ==============================================================================

/// A `balances.Transfer` record from `from` to `to` at `height`.
pub fn transfer(height: u64, from: &AccountId, to: &AccountId, amount: u128) -> TransactionRecord {
    TransactionRecord {
        height: BlockHeight(height),
        block_hash: None,
        event: "balances.Transfer".to_owned(),
        sender_id: from.to_ss58(),
        recipient_id: to.to_ss58(),
        amount,
    }
}
