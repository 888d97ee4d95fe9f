use crate::block::BlockSummary;
use alloy_primitives::{Address, B256, TxHash, U64, U256};
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use anyhow::Result;
use async_trait::async_trait;
use op_alloy_network::Optimism;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// A block as reported by the chain, with full transaction objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBlock {
    /// `None` for a pending block.
    pub hash: Option<B256>,
    #[serde(default, with = "alloy_serde::quantity::opt")]
    pub number: Option<u64>,
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    pub gas_used: U256,
    pub gas_limit: U256,
    #[serde(default)]
    pub transactions: Vec<SourceTransaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceTransaction {
    pub hash: TxHash,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    pub gas: U256,
}

/// Read access to settled blocks.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn block_by_hash(&self, hash: B256) -> Result<Option<SourceBlock>>;

    async fn latest_block_number(&self) -> Result<u64>;

    async fn block_summary_by_number(&self, number: u64) -> Result<Option<BlockSummary>>;
}

#[derive(Debug, Clone, Deserialize)]
struct RpcBlockHeader {
    hash: Option<B256>,
    #[serde(default, with = "alloy_serde::quantity::opt")]
    number: Option<u64>,
    #[serde(with = "alloy_serde::quantity")]
    timestamp: u64,
    #[serde(default)]
    transactions: Vec<serde_json::Value>,
}

/// [`BlockSource`] backed by an Ethereum JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcBlockSource {
    provider: Arc<RootProvider<Optimism>>,
}

impl RpcBlockSource {
    pub const fn new(provider: Arc<RootProvider<Optimism>>) -> Self {
        Self { provider }
    }

    pub fn connect(rpc_url: Url) -> Self {
        let provider: RootProvider<Optimism> = ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<Optimism>()
            .connect_http(rpc_url);
        Self::new(Arc::new(provider))
    }
}

#[async_trait]
impl BlockSource for RpcBlockSource {
    async fn block_by_hash(&self, hash: B256) -> Result<Option<SourceBlock>> {
        let block: Option<SourceBlock> = self
            .provider
            .raw_request("eth_getBlockByHash".into(), (hash, true))
            .await?;

        debug!(
            block_hash = %hash,
            found = block.is_some(),
            "Fetched block from RPC"
        );
        Ok(block)
    }

    async fn latest_block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn block_summary_by_number(&self, number: u64) -> Result<Option<BlockSummary>> {
        let header: Option<RpcBlockHeader> = self
            .provider
            .raw_request("eth_getBlockByNumber".into(), (U64::from(number), false))
            .await?;

        Ok(header.and_then(|header| {
            Some(BlockSummary {
                hash: header.hash?,
                number: header.number.unwrap_or(number),
                timestamp: header.timestamp,
                transaction_count: header.transactions.len(),
            })
        }))
    }
}
