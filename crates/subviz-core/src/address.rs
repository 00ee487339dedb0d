//! SS58 account identifiers.
//!
//! Ledger rows and label files carry addresses as SS58 strings, while
//! storage keys need the raw 32-byte public key. [`AccountId`] keeps both
//! the key and the network prefix it was encoded with, so accounts read back
//! from chain storage (controllers, payees) can be rendered in the same
//! format as the address that led to them.

use std::fmt;
use std::str::FromStr;

use blake2::{Blake2b512, Digest};

use crate::error::CoreError;

const SS58_CHECKSUM_PREFIX: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;

/// Generic Substrate network prefix, used for hex-supplied accounts.
pub const GENERIC_SS58_PREFIX: u16 = 42;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId {
    key: [u8; 32],
    prefix: u16,
}

impl AccountId {
    pub fn new(key: [u8; 32], prefix: u16) -> Self {
        Self { key, prefix }
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn prefix(&self) -> u16 {
        self.prefix
    }

    /// Same prefix, different key. Used for accounts decoded from storage.
    pub fn sibling(&self, key: [u8; 32]) -> Self {
        Self::new(key, self.prefix)
    }

    pub fn to_ss58(&self) -> String {
        let mut data = prefix_bytes(self.prefix);
        data.extend_from_slice(&self.key);
        let checksum = ss58_hash(&data);
        data.extend_from_slice(&checksum[..CHECKSUM_LEN]);
        bs58::encode(data).into_string()
    }
}

impl FromStr for AccountId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| CoreError::InvalidAddress {
            address: s.to_owned(),
            reason,
        };

        if let Some(hex_key) = s.strip_prefix("0x") {
            let bytes = hex::decode(hex_key).map_err(|e| invalid(e.to_string()))?;
            let key: [u8; 32] = bytes
                .try_into()
                .map_err(|_| invalid("hex account must be 32 bytes".to_owned()))?;
            return Ok(Self::new(key, GENERIC_SS58_PREFIX));
        }

        let data = bs58::decode(s)
            .into_vec()
            .map_err(|e| invalid(format!("not base58: {e}")))?;

        let (prefix, prefix_len) = match data.first() {
            Some(&b) if b < 64 => (u16::from(b), 1),
            Some(&b) if b < 128 => {
                let second = *data
                    .get(1)
                    .ok_or_else(|| invalid("truncated prefix".to_owned()))?;
                let lower = (b << 2) | (second >> 6);
                let upper = second & 0b0011_1111;
                (u16::from(lower) | (u16::from(upper) << 8), 2)
            }
            Some(_) => return Err(invalid("reserved SS58 prefix".to_owned())),
            None => return Err(invalid("empty address".to_owned())),
        };

        if data.len() != prefix_len + 32 + CHECKSUM_LEN {
            return Err(invalid(format!(
                "expected {} bytes, got {}",
                prefix_len + 32 + CHECKSUM_LEN,
                data.len()
            )));
        }

        let body_len = prefix_len + 32;
        let checksum = ss58_hash(&data[..body_len]);
        if data[body_len..] != checksum[..CHECKSUM_LEN] {
            return Err(invalid("checksum mismatch".to_owned()));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&data[prefix_len..body_len]);
        Ok(Self::new(key, prefix))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ss58())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_ss58())
    }
}

fn prefix_bytes(prefix: u16) -> Vec<u8> {
    if prefix < 64 {
        vec![prefix as u8]
    } else {
        let first = ((prefix & 0b0000_0000_1111_1100) as u8 >> 2) | 0b0100_0000;
        let second = ((prefix >> 8) as u8) | (((prefix & 0b0000_0000_0000_0011) as u8) << 6);
        vec![first, second]
    }
}

fn ss58_hash(data: &[u8]) -> Vec<u8> {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_CHECKSUM_PREFIX);
    hasher.update(data);
    hasher.finalize().to_vec()
}
