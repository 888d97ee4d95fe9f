//! Enriched block records as persisted under `blocks/{hash}`.

use crate::types::BundleId;
use alloy_primitives::{Address, B256, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A settled block together with bundle enrichment for each of its transactions.
///
/// Integer quantities are written as decimal strings so values beyond 2^53 survive
/// consumers that parse JSON numbers as doubles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub hash: B256,
    #[serde(with = "decimal")]
    pub number: u64,
    #[serde(with = "decimal")]
    pub timestamp: u64,
    /// In execution order; `transactions[i].index == i`.
    pub transactions: Vec<TransactionRecord>,
    #[serde(with = "decimal")]
    pub gas_used: U256,
    #[serde(with = "decimal")]
    pub gas_limit: U256,
    /// Milliseconds since the unix epoch at which this record was last written.
    pub cached_at: u64,
}

impl BlockRecord {
    /// Transactions that lack a bundle association and are eligible for another attempt.
    pub fn transactions_needing_enrichment(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.transactions.iter().filter(|tx| tx.needs_enrichment())
    }

    /// Whether `transactions[i].index == i` for every transaction. The system transaction
    /// exemption relies on it.
    pub fn has_contiguous_indices(&self) -> bool {
        self.transactions
            .iter()
            .enumerate()
            .all(|(position, tx)| tx.index == position as u64)
    }

    pub fn age_millis(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.cached_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: TxHash,
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    #[serde(with = "decimal")]
    pub gas_used: U256,
    pub execution_time_us: Option<u64>,
    pub bundle_id: Option<BundleId>,
    pub index: u64,
}

impl TransactionRecord {
    /// The first transaction of an OP Stack block is the L1 attributes deposit.
    pub const fn is_system_transaction(&self) -> bool {
        self.index == 0
    }

    pub const fn needs_enrichment(&self) -> bool {
        self.bundle_id.is_none() && !self.is_system_transaction()
    }
}

/// Lightweight view of a block used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub hash: B256,
    pub number: u64,
    pub timestamp: u64,
    pub transaction_count: usize,
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Serializes integers as decimal strings. Accepts either strings or plain JSON numbers.
pub(crate) mod decimal {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    pub(crate) fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.trim().parse().map_err(de::Error::custom),
            Repr::Number(number) => number.to_string().parse().map_err(de::Error::custom),
        }
    }
}
