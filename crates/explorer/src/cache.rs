//! Durable cache of enriched blocks.
//!
//! A lookup first consults `blocks/{hash}` in the object store. On a hit, only transactions
//! that still lack a bundle association are re-resolved, and the record is rewritten only when
//! one of them gained one. On a miss the block is fetched from the [`BlockSource`], every
//! non-system transaction is resolved concurrently, and the record is written unconditionally.
//!
//! Concurrent lookups of the same hash may both fetch and both write. The last write wins,
//! which is safe since a merge never clears a known bundle association.

use crate::block::{BlockRecord, TransactionRecord, unix_millis};
use crate::enrichment::{BundleEnrichmentResolver, BundleSelector, Enrichment, FirstBundle};
use crate::metrics::Metrics;
use crate::source::BlockSource;
use crate::storage::{Decoded, ObjectStore, StorageKey, read_json};
use alloy_primitives::{B256, TxHash};
use alloy_primitives::map::HashMap;
use anyhow::Result;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCacheConfig {
    /// Cached records older than this are refetched and overwritten. `None` keeps them forever.
    pub max_age: Option<Duration>,
}

pub struct BlockEnrichmentCache<S, B, P = FirstBundle> {
    store: S,
    source: Arc<B>,
    resolver: BundleEnrichmentResolver<S, P>,
    config: BlockCacheConfig,
    metrics: Metrics,
}

impl<S, B, P> fmt::Debug for BlockEnrichmentCache<S, B, P>
where
    S: fmt::Debug,
    B: fmt::Debug,
    P: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockEnrichmentCache")
            .field("store", &self.store)
            .field("source", &self.source)
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, B, P> BlockEnrichmentCache<S, B, P>
where
    S: ObjectStore + Clone + 'static,
    B: BlockSource,
    P: BundleSelector + Clone + 'static,
{
    pub fn new(
        store: S,
        source: Arc<B>,
        resolver: BundleEnrichmentResolver<S, P>,
        config: BlockCacheConfig,
    ) -> Self {
        Self {
            store,
            source,
            resolver,
            config,
            metrics: Metrics::default(),
        }
    }

    pub const fn resolver(&self) -> &BundleEnrichmentResolver<S, P> {
        &self.resolver
    }

    /// Returns the enriched block, or `None` if neither the cache nor the source knows it.
    ///
    /// Errors only when persisting the record fails.
    pub async fn get_enriched_block(&self, block_hash: B256) -> Result<Option<BlockRecord>> {
        let start = Instant::now();
        let result = self.lookup(block_hash).await;
        self.metrics
            .get_enriched_block_duration
            .record(start.elapsed().as_secs_f64());
        result
    }

    async fn lookup(&self, block_hash: B256) -> Result<Option<BlockRecord>> {
        match self.read_cached(block_hash).await {
            Some(record) if self.is_expired(&record) => {
                self.metrics.block_cache_expired.increment(1);
                debug!(
                    block_hash = %block_hash,
                    cached_at = record.cached_at,
                    "Cached block expired, refetching"
                );
                match self.fetch_from_source(block_hash, Some(&record)).await? {
                    Some(fresh) => Ok(Some(fresh)),
                    // Source can't produce it anymore, serve what we have.
                    None => Ok(Some(record)),
                }
            }
            Some(record) => {
                self.metrics.block_cache_hits.increment(1);
                self.backfill(record).await.map(Some)
            }
            None => {
                self.metrics.block_cache_misses.increment(1);
                self.fetch_from_source(block_hash, None).await
            }
        }
    }

    async fn read_cached(&self, block_hash: B256) -> Option<BlockRecord> {
        let key = StorageKey::Block(block_hash);
        match read_json(&self.store, &key).await {
            Ok(decoded @ Decoded::Malformed(_)) => {
                self.metrics.malformed_records.increment(1);
                decoded.found_or_log(&key)
            }
            Ok(Decoded::Found(record)) if !record.has_contiguous_indices() => {
                self.metrics.malformed_records.increment(1);
                warn!(
                    block_hash = %block_hash,
                    "Cached block has out-of-order transaction indices, treating as miss"
                );
                None
            }
            Ok(decoded) => decoded.found_or_log(&key),
            Err(e) => {
                warn!(block_hash = %block_hash, error = %e, "Failed to read block cache, treating as miss");
                None
            }
        }
    }

    fn is_expired(&self, record: &BlockRecord) -> bool {
        self.config
            .max_age
            .is_some_and(|max_age| u128::from(record.age_millis(unix_millis())) > max_age.as_millis())
    }

    async fn backfill(&self, mut record: BlockRecord) -> Result<BlockRecord> {
        let pending: Vec<TxHash> = record
            .transactions_needing_enrichment()
            .map(|tx| tx.hash)
            .collect();

        if pending.is_empty() {
            return Ok(record);
        }

        let resolved: HashMap<TxHash, Enrichment> = self
            .resolve_all(pending)
            .await
            .into_iter()
            .filter(|(_, enrichment)| enrichment.is_found())
            .collect();

        let mut updated = 0usize;
        for tx in record.transactions.iter_mut().filter(|tx| tx.needs_enrichment()) {
            if let Some(enrichment) = resolved.get(&tx.hash) {
                tx.bundle_id = enrichment.bundle_id;
                tx.execution_time_us = enrichment.execution_time_us;
                updated += 1;
            }
        }

        if updated == 0 {
            return Ok(record);
        }

        record.cached_at = unix_millis();
        self.persist(&record).await?;
        self.metrics.backfilled_transactions.increment(updated as u64);

        info!(
            block_hash = %record.hash,
            updated_transactions = updated,
            "Backfilled bundle data for cached block"
        );
        Ok(record)
    }

    /// Builds a record from the source. Associations already known to `previous` are carried
    /// over wherever the fresh resolution found nothing.
    async fn fetch_from_source(
        &self,
        block_hash: B256,
        previous: Option<&BlockRecord>,
    ) -> Result<Option<BlockRecord>> {
        let block = match self.source.block_by_hash(block_hash).await {
            Ok(Some(block)) => block,
            Ok(None) => {
                debug!(block_hash = %block_hash, "Block not found at source");
                return Ok(None);
            }
            Err(e) => {
                self.metrics.source_fetch_failures.increment(1);
                warn!(block_hash = %block_hash, error = %e, "Failed to fetch block from source");
                return Ok(None);
            }
        };

        let (Some(hash), Some(number)) = (block.hash, block.number) else {
            debug!(block_hash = %block_hash, "Source returned a pending block");
            return Ok(None);
        };

        let mut transactions: Vec<TransactionRecord> = block
            .transactions
            .into_iter()
            .enumerate()
            .map(|(index, tx)| TransactionRecord {
                hash: tx.hash,
                from: tx.from,
                to: tx.to,
                gas_used: tx.gas,
                execution_time_us: None,
                bundle_id: None,
                index: index as u64,
            })
            .collect();

        let pending: Vec<TxHash> = transactions
            .iter()
            .filter(|tx| tx.needs_enrichment())
            .map(|tx| tx.hash)
            .collect();

        // Results come back in request order, which is transaction order minus the system
        // transaction.
        let mut resolved = self.resolve_all(pending).await.into_iter();
        for tx in transactions.iter_mut().filter(|tx| tx.needs_enrichment()) {
            if let Some((_, enrichment)) = resolved.next() {
                tx.bundle_id = enrichment.bundle_id;
                tx.execution_time_us = enrichment.execution_time_us;
            }
        }

        if let Some(previous) = previous {
            let known: HashMap<TxHash, &TransactionRecord> = previous
                .transactions
                .iter()
                .filter(|tx| tx.bundle_id.is_some())
                .map(|tx| (tx.hash, tx))
                .collect();
            for tx in transactions.iter_mut().filter(|tx| tx.needs_enrichment()) {
                if let Some(known) = known.get(&tx.hash) {
                    tx.bundle_id = known.bundle_id;
                    tx.execution_time_us = known.execution_time_us;
                }
            }
        }

        let record = BlockRecord {
            hash,
            number,
            timestamp: block.timestamp,
            transactions,
            gas_used: block.gas_used,
            gas_limit: block.gas_limit,
            cached_at: unix_millis(),
        };

        self.persist(&record).await?;

        info!(
            block_hash = %record.hash,
            block_number = record.number,
            transaction_count = record.transactions.len(),
            enriched_count = record.transactions.iter().filter(|tx| tx.bundle_id.is_some()).count(),
            "Cached block from source"
        );
        Ok(Some(record))
    }

    /// Resolves every hash on its own task. A task that fails is reported as not found
    /// without affecting the others. Output order matches input order.
    async fn resolve_all(&self, hashes: Vec<TxHash>) -> Vec<(TxHash, Enrichment)> {
        let handles: Vec<_> = hashes
            .into_iter()
            .map(|hash| {
                let resolver = self.resolver.clone();
                (hash, tokio::spawn(async move { resolver.resolve(hash).await }))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (hash, handle) in handles {
            let enrichment = match handle.await {
                Ok(enrichment) => enrichment,
                Err(e) => {
                    self.metrics.enrichment_failures.increment(1);
                    warn!(tx_hash = %hash, error = %e, "Enrichment task failed");
                    Enrichment::NOT_FOUND
                }
            };
            results.push((hash, enrichment));
        }
        results
    }

    async fn persist(&self, record: &BlockRecord) -> Result<()> {
        let key = StorageKey::Block(record.hash);
        let content = serde_json::to_vec(record)?;
        self.store.put(&key.to_string(), Bytes::from(content)).await?;
        self.metrics.block_cache_writes.increment(1);
        Ok(())
    }
}
