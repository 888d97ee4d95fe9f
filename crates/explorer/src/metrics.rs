use metrics::{Counter, Histogram};
use metrics_derive::Metrics;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Metrics for the `tips_explorer` component.
/// Conventions:
/// - Durations are recorded in seconds (histograms).
/// - Counters are monotonic event counts.
#[derive(Metrics, Clone)]
#[metrics(scope = "tips_explorer")]
pub struct Metrics {
    #[metric(describe = "Block lookups answered from the S3 block cache")]
    pub block_cache_hits: Counter,

    #[metric(describe = "Block lookups not present in the S3 block cache")]
    pub block_cache_misses: Counter,

    #[metric(describe = "Cached blocks older than the configured max age")]
    pub block_cache_expired: Counter,

    #[metric(describe = "Block records written to the S3 block cache")]
    pub block_cache_writes: Counter,

    #[metric(describe = "Transactions that gained a bundle association on backfill")]
    pub backfilled_transactions: Counter,

    #[metric(describe = "Block fetches from the RPC endpoint that failed")]
    pub source_fetch_failures: Counter,

    #[metric(describe = "Transaction enrichments that failed and were recorded as not found")]
    pub enrichment_failures: Counter,

    #[metric(describe = "Stored objects that failed to parse")]
    pub malformed_records: Counter,

    #[metric(describe = "Duration of get_enriched_block")]
    pub get_enriched_block_duration: Histogram,
}

/// Initialize Prometheus metrics exporter
pub fn init_prometheus_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {e}"))
}
