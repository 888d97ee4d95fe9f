//! Reusable mock implementations for testing

use alloy_primitives::B256;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tips_explorer::{BlockSource, BlockSummary, InMemoryObjectStore, ObjectStore, SourceBlock};

/// Block source backed by a map, tracking every lookup
#[derive(Debug, Clone, Default)]
pub struct MockBlockSource {
    blocks: Arc<Mutex<HashMap<B256, SourceBlock>>>,
    summaries: Arc<Mutex<HashMap<u64, BlockSummary>>>,
    failing_numbers: Arc<Mutex<Vec<u64>>>,
    latest: Arc<Mutex<Option<u64>>>,
    lookups: Arc<Mutex<Vec<B256>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockBlockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(self, block: SourceBlock) -> Self {
        let hash = block.hash.expect("mock blocks need a hash");
        self.blocks.lock().unwrap().insert(hash, block);
        self
    }

    pub fn with_latest(self, latest: u64) -> Self {
        *self.latest.lock().unwrap() = Some(latest);
        self
    }

    pub fn with_summary(self, summary: BlockSummary) -> Self {
        self.summaries.lock().unwrap().insert(summary.number, summary);
        self
    }

    pub fn failing_number(self, number: u64) -> Self {
        self.failing_numbers.lock().unwrap().push(number);
        self
    }

    /// Every call errors, as if the RPC endpoint were unreachable
    pub fn failing(self) -> Self {
        *self.fail.lock().unwrap() = true;
        self
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }

    fn check_available(&self) -> anyhow::Result<()> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl BlockSource for MockBlockSource {
    async fn block_by_hash(&self, hash: B256) -> anyhow::Result<Option<SourceBlock>> {
        self.lookups.lock().unwrap().push(hash);
        self.check_available()?;
        Ok(self.blocks.lock().unwrap().get(&hash).cloned())
    }

    async fn latest_block_number(&self) -> anyhow::Result<u64> {
        self.check_available()?;
        self.latest
            .lock()
            .unwrap()
            .ok_or_else(|| anyhow::anyhow!("no latest block configured"))
    }

    async fn block_summary_by_number(&self, number: u64) -> anyhow::Result<Option<BlockSummary>> {
        self.check_available()?;
        if self.failing_numbers.lock().unwrap().contains(&number) {
            anyhow::bail!("request for block {number} timed out");
        }
        Ok(self.summaries.lock().unwrap().get(&number).cloned())
    }
}

/// In-memory store that can be told to fail reads of given key prefixes or all writes
#[derive(Debug, Clone, Default)]
pub struct FaultyObjectStore {
    inner: InMemoryObjectStore,
    failing_get_prefixes: Arc<Mutex<Vec<String>>>,
    panicking_get_prefixes: Arc<Mutex<Vec<String>>>,
    fail_puts: Arc<Mutex<bool>>,
}

impl FaultyObjectStore {
    pub fn new(inner: InMemoryObjectStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn fail_gets_under(self, prefix: &str) -> Self {
        self.failing_get_prefixes
            .lock()
            .unwrap()
            .push(prefix.to_string());
        self
    }

    /// Reads of keys under `prefix` panic, taking down the task that issued them
    pub fn panic_gets_under(self, prefix: &str) -> Self {
        self.panicking_get_prefixes
            .lock()
            .unwrap()
            .push(prefix.to_string());
        self
    }

    pub fn fail_puts(self) -> Self {
        *self.fail_puts.lock().unwrap() = true;
        self
    }
}

#[async_trait]
impl ObjectStore for FaultyObjectStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        let panicking = self
            .panicking_get_prefixes
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()));
        if panicking {
            panic!("object store client poisoned reading {key}");
        }
        let failing = self
            .failing_get_prefixes
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()));
        if failing {
            anyhow::bail!("service unavailable reading {key}");
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> anyhow::Result<()> {
        if *self.fail_puts.lock().unwrap() {
            anyhow::bail!("access denied writing {key}");
        }
        self.inner.put(key, data).await
    }
}
