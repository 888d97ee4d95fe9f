use crate::block::{BlockRecord, BlockSummary};
use crate::cache::{BlockCacheConfig, BlockEnrichmentCache};
use crate::enrichment::{BundleEnrichmentResolver, BundleSelector, FirstBundle};
use crate::source::BlockSource;
use crate::storage::ObjectStore;
use crate::types::{BundleHistoryEvent, BundleId};
use alloy_primitives::{B256, TxHash};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default number of blocks returned by [`ExplorerService::recent_blocks`].
pub const DEFAULT_RECENT_BLOCKS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionHistory {
    pub hash: TxHash,
    pub bundle_ids: Vec<BundleId>,
    pub history: Vec<BundleHistoryEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleHistoryView {
    pub uuid: BundleId,
    /// Oldest first.
    pub history: Vec<BundleHistoryEvent>,
}

/// Read-side entry point: enriched blocks, transaction and bundle histories, recent blocks.
#[derive(Debug)]
pub struct ExplorerService<S, B, P = FirstBundle> {
    cache: BlockEnrichmentCache<S, B, P>,
    source: Arc<B>,
}

impl<S, B> ExplorerService<S, B>
where
    S: ObjectStore + Clone + 'static,
    B: BlockSource + 'static,
{
    pub fn new(store: S, source: B, config: BlockCacheConfig) -> Self {
        let resolver = BundleEnrichmentResolver::new(store.clone());
        Self::with_resolver(store, source, resolver, config)
    }
}

impl<S, B, P> ExplorerService<S, B, P>
where
    S: ObjectStore + Clone + 'static,
    B: BlockSource + 'static,
    P: BundleSelector + Clone + 'static,
{
    pub fn with_resolver(
        store: S,
        source: B,
        resolver: BundleEnrichmentResolver<S, P>,
        config: BlockCacheConfig,
    ) -> Self {
        let source = Arc::new(source);
        Self {
            cache: BlockEnrichmentCache::new(store, source.clone(), resolver, config),
            source,
        }
    }

    pub const fn cache(&self) -> &BlockEnrichmentCache<S, B, P> {
        &self.cache
    }

    pub async fn block(&self, block_hash: B256) -> Result<Option<BlockRecord>> {
        self.cache.get_enriched_block(block_hash).await
    }

    /// Lifecycle of the bundle a transaction was submitted in.
    pub async fn transaction_history(&self, tx_hash: TxHash) -> Result<Option<TransactionHistory>> {
        let resolver = self.cache.resolver();

        let Some(metadata) = resolver
            .transaction_index()
            .get_transaction_metadata(tx_hash)
            .await?
        else {
            debug!(tx_hash = %tx_hash, "Transaction not found in index");
            return Ok(None);
        };

        let Some(bundle_id) = resolver.selector().select(&metadata.bundle_ids) else {
            return Ok(None);
        };

        let Some(bundle) = resolver
            .bundle_history_store()
            .get_bundle_history(bundle_id)
            .await?
        else {
            debug!(tx_hash = %tx_hash, bundle_id = %bundle_id, "Bundle history not found");
            return Ok(None);
        };

        Ok(Some(TransactionHistory {
            hash: tx_hash,
            bundle_ids: metadata.bundle_ids,
            history: bundle.history,
        }))
    }

    pub async fn bundle_history(&self, bundle_id: BundleId) -> Result<Option<BundleHistoryView>> {
        let Some(mut bundle) = self
            .cache
            .resolver()
            .bundle_history_store()
            .get_bundle_history(bundle_id)
            .await?
        else {
            return Ok(None);
        };

        bundle.history.sort_by_key(|event| event.data.timestamp);

        Ok(Some(BundleHistoryView {
            uuid: bundle_id,
            history: bundle.history,
        }))
    }

    /// Summaries of the `count` most recent blocks, newest first. Blocks that can't be fetched
    /// are skipped.
    pub async fn recent_blocks(&self, count: u64) -> Result<Vec<BlockSummary>> {
        let latest = self.source.latest_block_number().await?;

        let handles: Vec<_> = (0..count.min(latest.saturating_add(1)))
            .map(|offset| {
                let number = latest - offset;
                let source = self.source.clone();
                (
                    number,
                    tokio::spawn(async move { source.block_summary_by_number(number).await }),
                )
            })
            .collect();

        let mut blocks = Vec::with_capacity(handles.len());
        for (number, handle) in handles {
            match handle.await {
                Ok(Ok(Some(summary))) => blocks.push(summary),
                Ok(Ok(None)) => debug!(block_number = number, "Block not found"),
                Ok(Err(e)) => warn!(block_number = number, error = %e, "Failed to fetch block"),
                Err(e) => warn!(block_number = number, error = %e, "Block fetch task failed"),
            }
        }
        Ok(blocks)
    }
}
