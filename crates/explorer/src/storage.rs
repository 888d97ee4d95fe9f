use crate::types::BundleId;
use alloy_primitives::{B256, TxHash};
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKey {
    Block(B256),
    Bundle(BundleId),
    TransactionByHash(TxHash),
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(hash) => write!(f, "blocks/{hash}"),
            Self::Bundle(bundle_id) => write!(f, "bundles/{bundle_id}"),
            Self::TransactionByHash(hash) => write!(f, "transactions/by_hash/{hash}"),
        }
    }
}

/// Blob storage keyed by string. A successful `put` is eventually visible to `get` on the same key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;
}

/// Outcome of reading a JSON document from the store.
#[derive(Debug)]
pub enum Decoded<T> {
    Found(T),
    Absent,
    Malformed(serde_json::Error),
}

impl<T> Decoded<T> {
    /// Collapses `Malformed` into absence, logging it so it can be told apart from a missing key.
    pub fn found_or_log(self, key: &StorageKey) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent => None,
            Self::Malformed(e) => {
                warn!(s3_key = %key, error = %e, "Malformed JSON in stored object, treating as absent");
                None
            }
        }
    }

    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

pub async fn read_json<T, S>(store: &S, key: &StorageKey) -> Result<Decoded<T>>
where
    T: DeserializeOwned,
    S: ObjectStore + ?Sized,
{
    let Some(content) = store.get(&key.to_string()).await? else {
        return Ok(Decoded::Absent);
    };

    Ok(match serde_json::from_slice(&content) {
        Ok(value) => Decoded::Found(value),
        Err(e) => Decoded::Malformed(e),
    })
}

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    s3_client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    pub const fn new(s3_client: S3Client, bucket: String) -> Self {
        Self { s3_client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let response = match self
            .s3_client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(service_error.into());
            }
        };

        let body = response.body.collect().await?;
        Ok(Some(body.into_bytes()))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let data_size = data.len();

        self.s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(data))
            .send()
            .await?;

        debug!(
            s3_key = %key,
            data_size = data_size,
            "Uploaded object to S3"
        );
        Ok(())
    }
}

/// Store kept in process memory. Counts reads and writes so callers can assert on I/O.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    gets: Arc<Mutex<usize>>,
    puts: Arc<Mutex<usize>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` as JSON under `key` without counting it as a write.
    pub fn insert_json<T: serde::Serialize>(&self, key: &StorageKey, value: &T) {
        let content = serde_json::to_vec(value).unwrap_or_default();
        self.insert_raw(key, content);
    }

    pub fn insert_raw(&self, key: &StorageKey, content: impl Into<Bytes>) {
        self.lock_objects().insert(key.to_string(), content.into());
    }

    pub fn object(&self, key: &StorageKey) -> Option<Bytes> {
        self.lock_objects().get(&key.to_string()).cloned()
    }

    pub fn get_count(&self) -> usize {
        *self.gets.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn put_count(&self) -> usize {
        *self.puts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, HashMap<String, Bytes>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        *self.gets.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(self.lock_objects().get(key).cloned())
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        *self.puts.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        self.lock_objects().insert(key.to_string(), data);
        Ok(())
    }
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        (**self).put(key, data).await
    }
}
