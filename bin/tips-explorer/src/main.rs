use alloy_primitives::{B256, TxHash};
use anyhow::bail;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tips_explorer::logger::init_logger;
use tips_explorer::metrics::init_prometheus_exporter;
use tips_explorer::{Config, ExplorerService, RpcBlockSource, S3ObjectStore};
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect bundles and enriched blocks recorded by TIPS", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enriched block by hash, served from the S3 block cache when possible
    Block { hash: B256 },
    /// Summaries of the most recent blocks
    Blocks,
    /// Bundle lifecycle for a transaction hash
    Transaction { hash: TxHash },
    /// Full event history of a bundle
    Bundle { uuid: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let Cli { config, command } = Cli::parse();

    init_logger(&config.log_level, config.log_format);

    if let Some(metrics_addr) = config.metrics_addr {
        init_prometheus_exporter(metrics_addr)?;
    }

    info!(
        message = "Starting tips explorer",
        rpc_url = %config.rpc_url,
        s3_bucket = %config.s3_bucket,
        s3_config_type = ?config.s3_config_type,
    );

    let store = S3ObjectStore::new(config.s3_client().await, config.s3_bucket.clone());
    let source = RpcBlockSource::connect(config.rpc_url.clone());
    let service = ExplorerService::new(store, source, config.block_cache_config());

    match command {
        Command::Block { hash } => match service.block(hash).await? {
            Some(block) => print_json(&block),
            None => bail!("Block {hash} not found"),
        },
        Command::Blocks => print_json(&service.recent_blocks(config.recent_blocks).await?),
        Command::Transaction { hash } => match service.transaction_history(hash).await? {
            Some(history) => print_json(&history),
            None => bail!("Transaction {hash} not found"),
        },
        Command::Bundle { uuid } => match service.bundle_history(uuid).await? {
            Some(history) => print_json(&history),
            None => bail!("Bundle {uuid} not found"),
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
