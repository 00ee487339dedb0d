//! Domain types for the subviz chain-state and transfer-graph model.
//!
//! Contains block references (`BlockHash`, `BlockHeight`, `BlockRef`), the
//! account snapshots produced by the resolver (`AccountBalance`,
//! `AccountStaking`), the ledger input (`TransactionRecord`), and the graph
//! output (`AddressNode`, `TransferEdge`, `TransferGraph`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

// ==============================================================================
// Block Hash
// ==============================================================================

/// A 32-byte block hash, rendered as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for BlockHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| CoreError::InvalidData(format!("invalid block hash `{s}`: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::InvalidData(format!(
                "invalid block hash `{s}`: expected 32 bytes, got {}",
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// Block Height
// ==============================================================================

/// A block number, wrapped for type safety.
///
/// `#[serde(transparent)]` keeps the JSON representation a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHeight(pub u64);

impl From<u64> for BlockHeight {
    fn from(h: u64) -> Self {
        Self(h)
    }
}

impl From<BlockHeight> for u64 {
    fn from(h: BlockHeight) -> Self {
        h.0
    }
}

impl std::ops::Deref for BlockHeight {
    type Target = u64;
    fn deref(&self) -> &u64 {
        &self.0
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The block a snapshot was resolved at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub hash: BlockHash,
    pub height: BlockHeight,
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.height, self.hash)
    }
}

/// The subset of a block header the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub number: BlockHeight,
}

// ==============================================================================
// Account Snapshots
// ==============================================================================

/// A single balance lock (`Balances.Locks` entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLock {
    /// Eight-byte lock identifier, e.g. `staking ` or `democrac`.
    pub id: [u8; 8],
    pub amount: u128,
    /// Raw withdraw-reasons value as stored on chain.
    pub reasons: u8,
    /// Expiry block; only present on pre-migration runtimes.
    pub until: Option<u64>,
}

impl BalanceLock {
    /// Lock identifier as text, trailing spaces and NULs trimmed.
    pub fn id_str(&self) -> String {
        String::from_utf8_lossy(&self.id)
            .trim_end_matches(['\0', ' '])
            .to_owned()
    }
}

/// Balance state of an account at a block. All amounts are in planck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub at: BlockRef,
    pub nonce: u64,
    pub free: u128,
    pub reserved: u128,
    pub misc_frozen: u128,
    pub fee_frozen: u128,
    pub locks: Vec<BalanceLock>,
}

impl AccountBalance {
    /// `free + reserved`, saturating at `u128::MAX`.
    pub fn total(&self) -> u128 {
        self.free.saturating_add(self.reserved)
    }
}

/// Where staking rewards are paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardDestination {
    Staked,
    Stash,
    Controller,
    /// Rewards go to an explicit account (SS58 encoded).
    Account(String),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockChunk {
    pub value: u128,
    pub era: u32,
}

/// The staking ledger of a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingLedger {
    pub stash: String,
    pub total: u128,
    pub active: u128,
    pub unlocking: Vec<UnlockChunk>,
}

/// Staking state of a bonded stash at a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStaking {
    pub at: BlockRef,
    pub controller: String,
    pub reward_destination: RewardDestination,
    pub num_slashing_spans: u32,
    pub staking: StakingLedger,
}

// ==============================================================================
// Ledger Records
// ==============================================================================

/// One transfer row read from the transaction ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub height: BlockHeight,
    pub block_hash: Option<String>,
    pub event: String,
    pub sender_id: String,
    pub recipient_id: String,
    /// Transferred amount in planck.
    pub amount: u128,
}

// ==============================================================================
// Transfer Graph
// ==============================================================================

/// Number of blocks added to a transfer's height to estimate finality.
///
/// This is a fixed heuristic, not derived from finality proofs.
pub const FINALITY_DEPTH: u64 = 6;

/// An address vertex with the balance observed when it was first seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressNode {
    pub id: String,
    pub label: String,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Directed,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directed => write!(f, "directed"),
        }
    }
}

/// One transfer between two addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub weight: f64,
    pub block: BlockHeight,
    /// `block + FINALITY_DEPTH`; approximate.
    pub finalized_estimate: BlockHeight,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub records_scanned: usize,
}

/// Address nodes in first-seen order and edges in record order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferGraph {
    pub nodes: Vec<AddressNode>,
    pub edges: Vec<TransferEdge>,
    pub stats: GraphStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_hash_parses_with_and_without_prefix() {
        let hex = "11".repeat(32);
        let a: BlockHash = format!("0x{hex}").parse().expect("prefixed hash must parse");
        let b: BlockHash = hex.parse().expect("bare hash must parse");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), format!("0x{hex}"));
    }

    #[test]
    fn block_hash_rejects_wrong_length() {
        let err = "0x1234".parse::<BlockHash>().expect_err("short hash must fail");
        assert!(err.to_string().contains("expected 32 bytes"));
    }

    #[test]
    fn balance_lock_id_is_trimmed() {
        let lock = BalanceLock {
            id: *b"staking ",
            amount: 1,
            reasons: 2,
            until: None,
        };
        assert_eq!(lock.id_str(), "staking");
    }
}
