use std::path::PathBuf;

use clap::Parser;

/// subviz: turn a Substrate transfer ledger and live account balances into
/// node/edge CSV tables for graph visualization.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Chain to process. Defaults to `defchain` from the config file.
    #[arg(env = "SUBVIZ_CHAIN")]
    pub chain: Option<String>,

    /// Path to the JSON config file.
    #[arg(long, default_value = "./config/config.json", env = "SUBVIZ_CONFIG")]
    pub config: PathBuf,

    /// CSV file with `id,Label` columns naming known addresses.
    #[arg(long, default_value = "./data/AddressNames.csv", env = "SUBVIZ_LABELS")]
    pub labels: PathBuf,

    /// Directory the node and edge CSV files are written to, as
    /// `nodes.csv` and `edges.csv`.
    #[arg(long, default_value = "./data", env = "SUBVIZ_OUT_DIR")]
    pub out_dir: PathBuf,

    /// Prefix the CSV file names with the chain name (`<chain>nodes.csv`,
    /// `<chain>edges.csv`) so runs for different chains do not overwrite
    /// each other.
    #[arg(long, env = "SUBVIZ_CHAIN_PREFIX")]
    pub chain_prefix: bool,

    /// Per-endpoint connection timeout in milliseconds.
    #[arg(long, default_value = "1000", env = "SUBVIZ_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: u64,

    /// Client-side RPC rate limit (requests per second). Unlimited if omitted.
    #[arg(long, env = "SUBVIZ_REQUESTS_PER_SECOND")]
    pub requests_per_second: Option<u32>,
}
