//! Storage key construction for the runtime storage items the resolver reads.
//!
//! A key is `twox_128(pallet) ++ twox_128(item)` followed by the hashed map
//! key(s). Which hasher a map uses depends on the runtime generation, so the
//! account schemas pass the hasher explicitly.

use std::fmt;

use blake2::digest::consts::{U16, U32};
use blake2::{Blake2b, Digest};
use twox_hash::XxHash64;

type Blake2b128 = Blake2b<U16>;
type Blake2b256 = Blake2b<U32>;

/// Map key hashers used by Substrate storage maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hasher {
    Blake2_128Concat,
    Blake2_256,
    Twox64Concat,
}

impl Hasher {
    pub fn hash(&self, key: &[u8]) -> Vec<u8> {
        match self {
            Self::Blake2_128Concat => {
                let mut out = blake2_128(key).to_vec();
                out.extend_from_slice(key);
                out
            }
            Self::Blake2_256 => blake2_256(key).to_vec(),
            Self::Twox64Concat => {
                let mut out = twox_64(key).to_vec();
                out.extend_from_slice(key);
                out
            }
        }
    }
}

/// A raw storage key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(pub Vec<u8>);

impl StorageKey {
    /// Prefix of a storage item (plain value or the whole map).
    pub fn prefix(pallet: &str, item: &str) -> Self {
        let mut key = twox_128(pallet.as_bytes()).to_vec();
        key.extend_from_slice(&twox_128(item.as_bytes()));
        Self(key)
    }

    /// Key of a single-key map entry.
    pub fn map(pallet: &str, item: &str, hasher: Hasher, map_key: &[u8]) -> Self {
        let mut key = Self::prefix(pallet, item);
        key.0.extend_from_slice(&hasher.hash(map_key));
        key
    }

    pub fn starts_with(&self, prefix: &StorageKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({})", self.to_hex())
    }
}

pub fn twox_64(data: &[u8]) -> [u8; 8] {
    XxHash64::oneshot(0, data).to_le_bytes()
}

pub fn twox_128(data: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&XxHash64::oneshot(0, data).to_le_bytes());
    out[8..].copy_from_slice(&XxHash64::oneshot(1, data).to_le_bytes());
    out
}

pub fn blake2_128(data: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&Blake2b128::digest(data));
    out
}

pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Blake2b256::digest(data));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_account_prefix_matches_runtime() {
        // Well-known prefix of `System.Account` on every Substrate chain.
        assert_eq!(
            StorageKey::prefix("System", "Account").to_hex(),
            "0x26aa394eea5630e07c48ae0c9558cef7b99d880ec681799c0cf30e8886371da9"
        );
    }

    #[test]
    fn concat_hashers_append_the_raw_key() {
        let key = [9u8; 32];
        let hashed = Hasher::Blake2_128Concat.hash(&key);
        assert_eq!(hashed.len(), 16 + 32);
        assert_eq!(&hashed[16..], &key);

        let hashed = Hasher::Twox64Concat.hash(&key);
        assert_eq!(hashed.len(), 8 + 32);
        assert_eq!(&hashed[8..], &key);
    }

    #[test]
    fn map_key_extends_prefix() {
        let prefix = StorageKey::prefix("Balances", "Locks");
        let entry = StorageKey::map("Balances", "Locks", Hasher::Blake2_256, &[1u8; 32]);
        assert!(entry.starts_with(&prefix));
        assert_eq!(entry.0.len(), 32 + 32);
    }
}
