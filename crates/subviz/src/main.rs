mod cli;
mod config;

use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;

use subviz_core::account::AccountStateResolver;
use subviz_core::amount::UnitScale;
use subviz_core::connection::EndpointConnection;
use subviz_core::export::{CsvExport, ExportSink};
use subviz_core::graph::GraphBuilder;
use subviz_core::labels::AddressBook;
use subviz_core::ledger::{LedgerStore, SqliteLedger};
use subviz_core::types::BlockHeight;

use config::{ChainConfig, Config};

/// The node serves a different chain than the one selected.
#[derive(Debug, thiserror::Error)]
#[error("chain mismatch: selected `{expected}` but the node reports `{actual}`")]
struct ChainMismatch {
    expected: String,
    actual: String,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    let config = Config::load(&args.config)?;
    let (chain_name, chain) = config.select(args.chain.as_deref())?;
    let scale = UnitScale::new(chain.planck_per_unit)
        .wrap_err_with(|| format!("planckPerUnit of chain `{chain_name}`"))?;

    tracing::info!("press Ctrl+C to cancel");

    // Cancelling drops the pipeline before export; nothing partial is written.
    tokio::select! {
        result = run(&args, &config, chain_name, chain, scale) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.wrap_err("listen for Ctrl+C")?;
            tracing::warn!("interrupted; no graph exported");
            Ok(())
        }
    }
}

async fn run(
    args: &cli::Cli,
    config: &Config,
    chain_name: &str,
    chain: &ChainConfig,
    scale: UnitScale,
) -> eyre::Result<()> {
    let mut connection = EndpointConnection::http(
        chain.providers.clone(),
        Duration::from_millis(args.connect_timeout_ms),
        args.requests_per_second,
    );
    let session = connection
        .connect()
        .await
        .wrap_err_with(|| format!("connect to a `{chain_name}` provider"))?;

    let info = session
        .rpc()
        .system_info()
        .await
        .wrap_err("read node identity")?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        chain = %info.chain,
        node = %info.node_name,
        node_version = %info.node_version,
        provider = session.endpoint(),
        schema = %session.schema_kind(),
        "connected to node"
    );
    check_chain(chain_name, &info.chain)?;

    let records = {
        let ledger_path = config.ledger_path(chain_name);
        let ledger = SqliteLedger::open(&ledger_path, chain_name)
            .wrap_err_with(|| format!("open ledger {}", ledger_path.display()))?;
        tracing::info!(
            records = ledger.count()?,
            max_height = ?ledger.max_height().map(|h| h.0),
            "ledger ready"
        );
        ledger
            .rows(&chain.event, BlockHeight(chain.start_block), chain.min_amount)
            .wrap_err("load ledger rows")?
    };
    tracing::info!(
        records = records.len(),
        start_block = chain.start_block,
        min_amount = %chain.min_amount,
        "scanning transfers"
    );

    let labels = load_labels(&args.labels)?;
    let resolver = AccountStateResolver::new(&session);
    let graph = GraphBuilder::new(&resolver, &labels, scale)
        .build(records)
        .await
        .wrap_err("build transfer graph")?;

    CsvExport::new(&args.out_dir)
        .export(export_name(chain_name, args.chain_prefix), &graph.nodes, &graph.edges)
        .wrap_err_with(|| format!("export graph to {}", args.out_dir.display()))?;

    Ok(())
}

/// File name prefix for the exported tables.
fn export_name(chain_name: &str, chain_prefix: bool) -> &str {
    if chain_prefix {
        chain_name
    } else {
        ""
    }
}

/// Names are compared ignoring ASCII case, so a config keyed `kusama`
/// accepts a node reporting `Kusama`.
fn check_chain(selected: &str, reported: &str) -> Result<(), ChainMismatch> {
    if selected.eq_ignore_ascii_case(reported) {
        Ok(())
    } else {
        Err(ChainMismatch {
            expected: selected.to_owned(),
            actual: reported.to_owned(),
        })
    }
}

/// A missing label file leaves every node labelled with its address.
fn load_labels(path: &std::path::Path) -> eyre::Result<AddressBook> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "label file not found; using addresses as labels");
        return Ok(AddressBook::new());
    }
    let labels = AddressBook::from_csv_path(path)
        .wrap_err_with(|| format!("load labels from {}", path.display()))?;
    tracing::info!(path = %path.display(), labels = labels.len(), "loaded address labels");
    Ok(labels)
}
