//! Records written by the audit archiver that the explorer reads back.

use alloy_primitives::{Address, B256, TxHash, U256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a bundle as assigned at ingress.
pub type BundleId = Uuid;

/// Contents of `transactions/by_hash/{hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    pub bundle_ids: Vec<BundleId>,
    pub sender: String,
    pub nonce: String,
}

/// Contents of `bundles/{id}`: every lifecycle event recorded for a bundle, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleHistory {
    pub history: Vec<BundleHistoryEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleHistoryEvent {
    pub event: BundleEventKind,
    pub data: BundleEventData,
}

impl BundleHistoryEvent {
    /// Per-transaction simulation results, if this is a `Received` event that carries them.
    pub fn simulation_results(&self) -> Option<&[TransactionResult]> {
        if self.event != BundleEventKind::Received {
            return None;
        }

        self.data
            .bundle
            .as_ref()?
            .meter_bundle_response
            .as_ref()
            .map(|response| response.results.as_slice())
    }
}

/// Kind tag of a bundle event. Kinds this crate doesn't know about are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BundleEventKind {
    Received,
    BuilderIncluded,
    BlockIncluded,
    Dropped,
    Other(String),
}

impl From<String> for BundleEventKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "Received" => Self::Received,
            "BuilderIncluded" => Self::BuilderIncluded,
            "BlockIncluded" => Self::BlockIncluded,
            "Dropped" => Self::Dropped,
            _ => Self::Other(kind),
        }
    }
}

impl From<BundleEventKind> for String {
    fn from(kind: BundleEventKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for BundleEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => f.write_str("Received"),
            Self::BuilderIncluded => f.write_str("BuilderIncluded"),
            Self::BlockIncluded => f.write_str("BlockIncluded"),
            Self::Dropped => f.write_str("Dropped"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

/// Kind-specific payload. Only the fields relevant to the event kind are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleEventData {
    #[serde(default, deserialize_with = "lenient")]
    pub key: String,
    /// Milliseconds since the unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub bundle: Option<BundleSnapshot>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub builder: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub flashblock_index: Option<u64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The bundle as it was accepted at ingress, including its metering results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleSnapshot {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub uuid: Option<BundleId>,
    #[serde(default, deserialize_with = "lenient")]
    pub txs: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub block_number: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max_timestamp: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub reverting_tx_hashes: Vec<TxHash>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub meter_bundle_response: Option<MeterBundleResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeterBundleResponse {
    #[serde(deserialize_with = "lenient")]
    pub bundle_gas_price: U256,
    #[serde(deserialize_with = "lenient")]
    pub bundle_hash: B256,
    #[serde(deserialize_with = "lenient")]
    pub coinbase_diff: U256,
    #[serde(deserialize_with = "lenient")]
    pub eth_sent_to_coinbase: U256,
    #[serde(deserialize_with = "lenient")]
    pub gas_fees: U256,
    #[serde(deserialize_with = "lenient")]
    pub results: Vec<TransactionResult>,
    #[serde(deserialize_with = "lenient")]
    pub state_block_number: u64,
    #[serde(deserialize_with = "lenient")]
    pub total_gas_used: u64,
    #[serde(deserialize_with = "lenient")]
    pub total_execution_time_us: u64,
}

/// Metering result of a single transaction within a bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransactionResult {
    #[serde(deserialize_with = "lenient")]
    pub coinbase_diff: U256,
    #[serde(deserialize_with = "lenient")]
    pub eth_sent_to_coinbase: U256,
    #[serde(deserialize_with = "lenient")]
    pub from_address: Address,
    #[serde(deserialize_with = "lenient")]
    pub gas_fees: U256,
    #[serde(deserialize_with = "lenient")]
    pub gas_price: U256,
    #[serde(deserialize_with = "lenient")]
    pub gas_used: u64,
    #[serde(deserialize_with = "lenient")]
    pub to_address: Option<Address>,
    #[serde(deserialize_with = "lenient")]
    pub tx_hash: TxHash,
    #[serde(deserialize_with = "lenient")]
    pub value: U256,
    #[serde(deserialize_with = "lenient")]
    pub execution_time_us: Option<u64>,
}

/// Decodes `T`, falling back to its default when the stored value has an unexpected shape.
/// Keeps one odd field from rejecting a whole bundle history.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
