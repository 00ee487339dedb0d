//! SCALE layouts of the storage values read by the account schemas.

use parity_scale_codec::{Compact, Decode, Encode};

use crate::error::CoreError;
use crate::types::{BalanceLock, RewardDestination, UnlockChunk};

/// Size of the balances `AccountData` section: four `u128` fields.
pub(crate) const ACCOUNT_DATA_LEN: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode)]
pub struct AccountData {
    pub free: u128,
    pub reserved: u128,
    pub misc_frozen: u128,
    pub fee_frozen: u128,
}

/// `ExtraFlags` bit set on every account once balances migrated to the
/// `{free, reserved, frozen, flags}` layout.
const IS_NEW_LOGIC: u128 = 1 << 127;

impl AccountData {
    /// Map the `{free, reserved, frozen, flags}` layout onto the frozen pair:
    /// the single `frozen` amount applies to both.
    pub(crate) fn normalized(self) -> Self {
        if self.fee_frozen & IS_NEW_LOGIC != 0 {
            Self {
                fee_frozen: self.misc_frozen,
                ..self
            }
        } else {
            self
        }
    }
}

/// `System.Account` value on current runtimes.
#[derive(Debug, Clone, Default, Encode, Decode)]
pub struct AccountInfo {
    pub nonce: u32,
    pub consumers: u32,
    pub providers: u32,
    pub sufficients: u32,
    pub data: AccountData,
}

/// `System.Account` value on the first unified runtimes, where balances
/// still lived in `Balances.Account`.
#[derive(Debug, Clone, Default, Encode, Decode)]
pub struct AccountInfoWithoutData {
    pub nonce: u32,
    pub refcount: u8,
}

/// The nonce and, when present, the trailing `AccountData` of a
/// `System.Account` value.
///
/// The fields between the nonce and the data changed shape over several
/// runtime upgrades (`refcount: u8`, `refcount: u32`, then
/// `consumers/providers/sufficients`), but the nonce always leads and the
/// data always trails, so both are read by position.
pub(crate) fn split_system_account(bytes: &[u8]) -> Result<(u32, Option<AccountData>), CoreError> {
    let nonce = u32::decode(&mut &bytes[..])
        .map_err(|e| CoreError::InvalidData(format!("System.Account nonce: {e}")))?;
    if bytes.len() < 4 + ACCOUNT_DATA_LEN {
        return Ok((nonce, None));
    }
    let tail = &bytes[bytes.len() - ACCOUNT_DATA_LEN..];
    let data = decode_value::<AccountData>(tail, "System.Account data")?;
    Ok((nonce, Some(data.normalized())))
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct LockV1 {
    pub id: [u8; 8],
    pub amount: u128,
    pub until: u32,
    pub reasons: u8,
}

impl From<LockV1> for BalanceLock {
    fn from(lock: LockV1) -> Self {
        Self {
            id: lock.id,
            amount: lock.amount,
            reasons: lock.reasons,
            until: Some(u64::from(lock.until)),
        }
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct LockV2 {
    pub id: [u8; 8],
    pub amount: u128,
    pub reasons: u8,
}

impl From<LockV2> for BalanceLock {
    fn from(lock: LockV2) -> Self {
        Self {
            id: lock.id,
            amount: lock.amount,
            reasons: lock.reasons,
            until: None,
        }
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct UnlockChunkRaw {
    pub value: Compact<u128>,
    pub era: Compact<u32>,
}

/// Leading fields of `Staking.Ledger`. Later fields (claimed rewards)
/// differ between runtimes and are not read.
#[derive(Debug, Clone, Encode, Decode)]
pub struct StakingLedgerRaw {
    pub stash: [u8; 32],
    pub total: Compact<u128>,
    pub active: Compact<u128>,
    pub unlocking: Vec<UnlockChunkRaw>,
}

impl StakingLedgerRaw {
    pub(crate) fn unlocking(&self) -> Vec<UnlockChunk> {
        self.unlocking
            .iter()
            .map(|chunk| UnlockChunk {
                value: chunk.value.0,
                era: chunk.era.0,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode)]
pub enum RewardDestinationRaw {
    #[default]
    Staked,
    Stash,
    Controller,
    Account([u8; 32]),
    None,
}

impl RewardDestinationRaw {
    /// Render with `encode_account` turning raw keys into addresses.
    pub(crate) fn into_destination(
        self,
        encode_account: impl Fn([u8; 32]) -> String,
    ) -> RewardDestination {
        match self {
            Self::Staked => RewardDestination::Staked,
            Self::Stash => RewardDestination::Stash,
            Self::Controller => RewardDestination::Controller,
            Self::Account(key) => RewardDestination::Account(encode_account(key)),
            Self::None => RewardDestination::None,
        }
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct SlashingSpansRaw {
    pub span_index: u32,
    pub last_start: u32,
    pub last_nonzero_slash: u32,
    pub prior: Vec<u32>,
}

impl SlashingSpansRaw {
    /// The current span plus every prior one.
    pub(crate) fn count(&self) -> u32 {
        self.prior.len() as u32 + 1
    }
}

/// Decode a storage value, ignoring trailing bytes the layout does not cover.
pub(crate) fn decode_value<T: Decode>(bytes: &[u8], what: &str) -> Result<T, CoreError> {
    T::decode(&mut &bytes[..]).map_err(|e| CoreError::InvalidData(format!("decode {what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> AccountData {
        AccountData {
            free: 7,
            reserved: 3,
            misc_frozen: 1,
            fee_frozen: 2,
        }
    }

    #[test]
    fn split_reads_current_account_info() {
        let info = AccountInfo {
            nonce: 9,
            providers: 1,
            data: data(),
            ..Default::default()
        };
        let (nonce, parsed) = split_system_account(&info.encode()).unwrap();
        assert_eq!(nonce, 9);
        assert_eq!(parsed, Some(data()));
    }

    #[test]
    fn split_reads_frozen_and_flags_layout() {
        // nonce, consumers, providers, sufficients, free, reserved, frozen, flags
        let bytes = (7u32, 0u32, 1u32, 0u32, 1000u128, 20u128, 300u128, IS_NEW_LOGIC).encode();
        let (nonce, parsed) = split_system_account(&bytes).unwrap();
        assert_eq!(nonce, 7);
        assert_eq!(
            parsed,
            Some(AccountData {
                free: 1000,
                reserved: 20,
                misc_frozen: 300,
                fee_frozen: 300,
            })
        );
    }

    #[test]
    fn split_reads_refcount_u8_layout() {
        let mut bytes = (4u32, 1u8).encode();
        bytes.extend(data().encode());
        let (nonce, parsed) = split_system_account(&bytes).unwrap();
        assert_eq!(nonce, 4);
        assert_eq!(parsed, Some(data()));
    }

    #[test]
    fn split_reports_missing_data() {
        let info = AccountInfoWithoutData {
            nonce: 2,
            refcount: 1,
        };
        let (nonce, parsed) = split_system_account(&info.encode()).unwrap();
        assert_eq!(nonce, 2);
        assert_eq!(parsed, None);
    }

    #[test]
    fn staking_ledger_ignores_trailing_fields() {
        let ledger = StakingLedgerRaw {
            stash: [1; 32],
            total: Compact(100),
            active: Compact(80),
            unlocking: vec![UnlockChunkRaw {
                value: Compact(20),
                era: Compact(42),
            }],
        };
        let mut bytes = ledger.encode();
        // claimed_rewards: Vec<u32>
        bytes.extend(vec![1u32, 2, 3].encode());

        let decoded: StakingLedgerRaw = decode_value(&bytes, "ledger").unwrap();
        assert_eq!(decoded.total.0, 100);
        assert_eq!(
            decoded.unlocking(),
            vec![UnlockChunk {
                value: 20,
                era: 42
            }]
        );
    }

    #[test]
    fn reward_destination_account_is_rendered() {
        let dest = RewardDestinationRaw::Account([5; 32])
            .into_destination(|key| format!("acct-{}", key[0]));
        assert_eq!(dest, RewardDestination::Account("acct-5".into()));
    }
}
