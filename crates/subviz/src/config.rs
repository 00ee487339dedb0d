//! JSON run configuration.
//!
//! ```json
//! {
//!   "defchain": "Kusama",
//!   "filename": "./data/",
//!   "chains": {
//!     "Kusama": {
//!       "providers": ["wss://kusama-rpc.polkadot.io"],
//!       "startBlock": 0,
//!       "planckPerUnit": "1000000000000",
//!       "minAmount": "10000000000000000"
//!     }
//!   }
//! }
//! ```
//!
//! Planck amounts may be given as JSON numbers or as decimal strings, since
//! useful values exceed what JSON numbers carry reliably.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use eyre::{eyre, WrapErr};
use serde::{Deserialize, Deserializer};

const DEFAULT_EVENT: &str = "balances.Transfer";
const DEFAULT_MIN_AMOUNT: u128 = 10_000_000_000_000_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Chain used when none is given on the command line.
    pub defchain: Option<String>,
    /// Prefix of the ledger database path; the chain name and `.db` are
    /// appended.
    #[serde(default = "default_filename")]
    pub filename: String,
    pub chains: BTreeMap<String, ChainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Endpoint URLs, tried in order.
    pub providers: Vec<String>,
    /// Only ledger rows above this height are used.
    #[serde(default)]
    pub start_block: u64,
    #[serde(deserialize_with = "de_planck")]
    pub planck_per_unit: u128,
    /// Only transfers above this amount (in planck) are used.
    #[serde(default = "default_min_amount", deserialize_with = "de_planck")]
    pub min_amount: u128,
    #[serde(default = "default_event")]
    pub event: String,
}

fn default_filename() -> String {
    "./data/".to_owned()
}

fn default_min_amount() -> u128 {
    DEFAULT_MIN_AMOUNT
}

fn default_event() -> String {
    DEFAULT_EVENT.to_owned()
}

fn de_planck<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Planck {
        Number(u64),
        Text(String),
    }

    match Planck::deserialize(deserializer)? {
        Planck::Number(n) => Ok(u128::from(n)),
        Planck::Text(s) => s
            .trim()
            .parse::<u128>()
            .map_err(|e| serde::de::Error::custom(format!("invalid planck amount `{s}`: {e}"))),
    }
}

impl Config {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("read config file {}", path.display()))?;
        Self::parse(&raw).wrap_err_with(|| format!("parse config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> eyre::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Resolve the chain to run: the explicit name, else `defchain`.
    pub fn select<'a>(&'a self, chain: Option<&'a str>) -> eyre::Result<(&'a str, &'a ChainConfig)> {
        let name = chain
            .or(self.defchain.as_deref())
            .ok_or_else(|| eyre!("no chain given and no `defchain` configured; {}", self.known()))?;
        let chain = self
            .chains
            .get(name)
            .ok_or_else(|| eyre!("unknown chain `{name}`; {}", self.known()))?;
        if chain.providers.is_empty() {
            return Err(eyre!("chain `{name}` has no providers configured"));
        }
        Ok((name, chain))
    }

    /// Path of the ledger database for `chain`.
    pub fn ledger_path(&self, chain: &str) -> PathBuf {
        PathBuf::from(format!("{}{chain}.db", self.filename))
    }

    fn known(&self) -> String {
        let names: Vec<&str> = self.chains.keys().map(String::as_str).collect();
        format!("expected one of [{}]", names.join(", "))
    }
}
