//! Read-only accessors over the audit archiver's S3 layout.
//!
//! Neither accessor caches: every call goes to the object store.

use crate::storage::{Decoded, ObjectStore, StorageKey, read_json};
use crate::types::{BundleHistory, BundleId, TransactionMetadata};
use alloy_primitives::TxHash;
use anyhow::Result;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct BundleHistoryStore<S> {
    store: S,
}

impl<S: ObjectStore> BundleHistoryStore<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_bundle_history(&self, bundle_id: BundleId) -> Result<Option<BundleHistory>> {
        Ok(self.read_bundle_history(bundle_id).await?.found_or_log(&StorageKey::Bundle(bundle_id)))
    }

    /// Same as [`Self::get_bundle_history`] but keeps malformed content distinguishable.
    pub async fn read_bundle_history(&self, bundle_id: BundleId) -> Result<Decoded<BundleHistory>> {
        let key = StorageKey::Bundle(bundle_id);
        let decoded = read_json(&self.store, &key).await?;
        if let Decoded::Found(BundleHistory { history }) = &decoded {
            debug!(bundle_id = %bundle_id, event_count = history.len(), "Loaded bundle history");
        }
        Ok(decoded)
    }
}

#[derive(Debug, Clone)]
pub struct TransactionIndex<S> {
    store: S,
}

impl<S: ObjectStore> TransactionIndex<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_transaction_metadata(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TransactionMetadata>> {
        Ok(self
            .read_transaction_metadata(tx_hash)
            .await?
            .found_or_log(&StorageKey::TransactionByHash(tx_hash)))
    }

    pub async fn read_transaction_metadata(
        &self,
        tx_hash: TxHash,
    ) -> Result<Decoded<TransactionMetadata>> {
        read_json(&self.store, &StorageKey::TransactionByHash(tx_hash)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryObjectStore;
    use crate::types::BundleEventKind;
    use alloy_primitives::b256;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_get_bundle_history() {
        let store = InMemoryObjectStore::new();
        let bundle_id = Uuid::new_v4();
        store.insert_json(
            &StorageKey::Bundle(bundle_id),
            &json!({
                "history": [
                    { "event": "Received", "data": { "key": "a", "timestamp": 10, "bundle": { "txs": [] } } },
                    { "event": "BlockIncluded", "data": { "key": "b", "timestamp": 20, "block_number": 7, "block_hash": "0x00000000000000000000000000000000000000000000000000000000000000ff" } }
                ]
            }),
        );

        let history = BundleHistoryStore::new(store.clone())
            .get_bundle_history(bundle_id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(history.history.len(), 2);
        assert_eq!(history.history[0].event, BundleEventKind::Received);
        assert_eq!(history.history[1].data.block_number, Some(7));
    }

    #[tokio::test]
    async fn test_malformed_transaction_metadata_is_absent() {
        let store = InMemoryObjectStore::new();
        let tx_hash = b256!("00000000000000000000000000000000000000000000000000000000000000a1");
        store.insert_raw(&StorageKey::TransactionByHash(tx_hash), "[1, 2");

        let index = TransactionIndex::new(store);
        assert!(index.read_transaction_metadata(tx_hash).await.unwrap().is_malformed());
        assert!(index.get_transaction_metadata(tx_hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_every_call_reads_the_store() {
        let store = InMemoryObjectStore::new();
        let tx_hash = b256!("00000000000000000000000000000000000000000000000000000000000000a2");
        store.insert_json(
            &StorageKey::TransactionByHash(tx_hash),
            &TransactionMetadata {
                bundle_ids: vec![Uuid::new_v4()],
                sender: "0x1000000000000000000000000000000000000001".to_string(),
                nonce: "3".to_string(),
            },
        );

        let index = TransactionIndex::new(store.clone());
        index.get_transaction_metadata(tx_hash).await.unwrap();
        index.get_transaction_metadata(tx_hash).await.unwrap();

        assert_eq!(store.get_count(), 2);
    }
}
