//! Attaches bundle association and metered execution time to on-chain transactions.

use crate::history::{BundleHistoryStore, TransactionIndex};
use crate::metrics::Metrics;
use crate::storage::{Decoded, ObjectStore, StorageKey};
use crate::types::{BundleHistory, BundleId};
use alloy_primitives::TxHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Bundle metadata for a single transaction. Both fields are `None` when no bundle is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub bundle_id: Option<BundleId>,
    /// Only meaningful when `bundle_id` is set.
    pub execution_time_us: Option<u64>,
}

impl Enrichment {
    pub const NOT_FOUND: Self = Self {
        bundle_id: None,
        execution_time_us: None,
    };

    const fn with_bundle(bundle_id: BundleId) -> Self {
        Self {
            bundle_id: Some(bundle_id),
            execution_time_us: None,
        }
    }

    pub const fn is_found(&self) -> bool {
        self.bundle_id.is_some()
    }
}

/// Picks the bundle to surface when a transaction was submitted in several bundles.
pub trait BundleSelector: Send + Sync {
    fn select(&self, bundle_ids: &[BundleId]) -> Option<BundleId>;
}

/// Surfaces the first bundle the transaction was indexed under.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstBundle;

impl BundleSelector for FirstBundle {
    fn select(&self, bundle_ids: &[BundleId]) -> Option<BundleId> {
        bundle_ids.first().copied()
    }
}

#[derive(Clone)]
pub struct BundleEnrichmentResolver<S, P = FirstBundle> {
    transactions: TransactionIndex<S>,
    bundles: BundleHistoryStore<S>,
    selector: P,
    metrics: Metrics,
}

impl<S, P> fmt::Debug for BundleEnrichmentResolver<S, P>
where
    S: fmt::Debug,
    P: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleEnrichmentResolver")
            .field("transactions", &self.transactions)
            .field("bundles", &self.bundles)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl<S> BundleEnrichmentResolver<S>
where
    S: ObjectStore + Clone,
{
    pub fn new(store: S) -> Self {
        Self::with_selector(store, FirstBundle)
    }
}

impl<S, P> BundleEnrichmentResolver<S, P>
where
    S: ObjectStore + Clone,
    P: BundleSelector,
{
    pub fn with_selector(store: S, selector: P) -> Self {
        Self {
            transactions: TransactionIndex::new(store.clone()),
            bundles: BundleHistoryStore::new(store),
            selector,
            metrics: Metrics::default(),
        }
    }

    pub const fn transaction_index(&self) -> &TransactionIndex<S> {
        &self.transactions
    }

    pub const fn bundle_history_store(&self) -> &BundleHistoryStore<S> {
        &self.bundles
    }

    pub const fn selector(&self) -> &P {
        &self.selector
    }

    /// Resolves enrichment for `tx_hash`. Lookup failures are logged and reported as not found.
    pub async fn resolve(&self, tx_hash: TxHash) -> Enrichment {
        let Some(bundle_id) = self.resolve_bundle_id(tx_hash).await else {
            return Enrichment::NOT_FOUND;
        };

        let history = match self.bundles.read_bundle_history(bundle_id).await {
            Ok(Decoded::Found(history)) => history,
            Ok(Decoded::Absent) => {
                debug!(tx_hash = %tx_hash, bundle_id = %bundle_id, "Bundle history not found");
                return Enrichment::with_bundle(bundle_id);
            }
            Ok(malformed @ Decoded::Malformed(_)) => {
                self.metrics.malformed_records.increment(1);
                malformed.found_or_log(&StorageKey::Bundle(bundle_id));
                return Enrichment::with_bundle(bundle_id);
            }
            Err(e) => {
                self.metrics.enrichment_failures.increment(1);
                warn!(
                    tx_hash = %tx_hash,
                    bundle_id = %bundle_id,
                    error = %e,
                    "Failed to read bundle history"
                );
                return Enrichment::with_bundle(bundle_id);
            }
        };

        Enrichment {
            bundle_id: Some(bundle_id),
            execution_time_us: execution_time_us(&history, tx_hash),
        }
    }

    async fn resolve_bundle_id(&self, tx_hash: TxHash) -> Option<BundleId> {
        let metadata = match self.transactions.read_transaction_metadata(tx_hash).await {
            Ok(Decoded::Found(metadata)) => metadata,
            Ok(Decoded::Absent) => return None,
            Ok(malformed @ Decoded::Malformed(_)) => {
                self.metrics.malformed_records.increment(1);
                malformed.found_or_log(&StorageKey::TransactionByHash(tx_hash));
                return None;
            }
            Err(e) => {
                self.metrics.enrichment_failures.increment(1);
                warn!(tx_hash = %tx_hash, error = %e, "Failed to read transaction index");
                return None;
            }
        };

        if metadata.bundle_ids.len() > 1 {
            debug!(
                tx_hash = %tx_hash,
                bundle_count = metadata.bundle_ids.len(),
                "Transaction belongs to several bundles, selecting one"
            );
        }

        self.selector.select(&metadata.bundle_ids)
    }
}

/// Execution time of `tx_hash` taken from the first `Received` event that carries metering results.
///
/// Hash comparison is on the decoded bytes, so hex casing in the stored document doesn't matter.
pub fn execution_time_us(history: &BundleHistory, tx_hash: TxHash) -> Option<u64> {
    history
        .history
        .iter()
        .find_map(|event| event.simulation_results())?
        .iter()
        .find(|result| result.tx_hash == tx_hash)?
        .execution_time_us
}
