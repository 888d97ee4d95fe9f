//! Test data builders for blocks, bundle histories and the transaction index

use alloy_primitives::{Address, B256, TxHash, U256};
use serde_json::{Value, json};
use tips_explorer::{
    BlockRecord, BundleId, InMemoryObjectStore, SourceBlock, SourceTransaction, StorageKey,
    TransactionMetadata, TransactionRecord,
};

pub fn tx_hash(n: u8) -> TxHash {
    B256::with_last_byte(n)
}

pub fn block_hash(n: u8) -> B256 {
    B256::repeat_byte(n)
}

pub fn sender(n: u8) -> Address {
    Address::with_last_byte(n)
}

/// A source block whose transactions are `tx_hash(1)..=tx_hash(count)`, in that order.
pub fn source_block(hash: B256, count: u8) -> SourceBlock {
    SourceBlock {
        hash: Some(hash),
        number: Some(1_000),
        timestamp: 1_700_000_000,
        gas_used: U256::from(21_000u64 * count as u64),
        gas_limit: U256::from(30_000_000u64),
        transactions: (1..=count)
            .map(|n| SourceTransaction {
                hash: tx_hash(n),
                from: sender(n),
                to: Some(sender(100 + n)),
                gas: U256::from(21_000u64),
            })
            .collect(),
    }
}

/// Cached record for `source_block(hash, enrichments.len())` with the given enrichment per index.
pub fn cached_block(hash: B256, enrichments: &[Option<(BundleId, Option<u64>)>]) -> BlockRecord {
    BlockRecord {
        hash,
        number: 1_000,
        timestamp: 1_700_000_000,
        transactions: enrichments
            .iter()
            .enumerate()
            .map(|(index, enrichment)| TransactionRecord {
                hash: tx_hash(index as u8 + 1),
                from: sender(index as u8 + 1),
                to: Some(sender(101 + index as u8)),
                gas_used: U256::from(21_000u64),
                execution_time_us: enrichment.and_then(|(_, time)| time),
                bundle_id: enrichment.map(|(id, _)| id),
                index: index as u64,
            })
            .collect(),
        gas_used: U256::from(63_000u64),
        gas_limit: U256::from(30_000_000u64),
        cached_at: 1,
    }
}

pub fn index_transaction(store: &InMemoryObjectStore, tx_hash: TxHash, bundle_ids: Vec<BundleId>) {
    store.insert_json(
        &StorageKey::TransactionByHash(tx_hash),
        &TransactionMetadata {
            bundle_ids,
            sender: format!("{:?}", sender(1)),
            nonce: "0".to_string(),
        },
    );
}

pub fn received_event(timestamp: i64, results: Option<Vec<(String, Option<u64>)>>) -> Value {
    let meter_bundle_response = results.map(|results| {
        json!({
            "bundleGasPrice": "1000000000",
            "bundleHash": format!("{:?}", B256::repeat_byte(0xbb)),
            "coinbaseDiff": "21000000000000",
            "ethSentToCoinbase": "0",
            "gasFees": "21000000000000",
            "results": results
                .into_iter()
                .map(|(hash, execution_time_us)| json!({
                    "coinbaseDiff": "21000000000000",
                    "ethSentToCoinbase": "0",
                    "fromAddress": format!("{:?}", sender(1)),
                    "gasFees": "21000000000000",
                    "gasPrice": "1000000000",
                    "gasUsed": 21000,
                    "toAddress": format!("{:?}", sender(2)),
                    "txHash": hash,
                    "value": "0",
                    "executionTimeUs": execution_time_us,
                }))
                .collect::<Vec<_>>(),
            "stateBlockNumber": 999,
            "totalGasUsed": 21000,
            "totalExecutionTimeUs": 500,
        })
    });

    json!({
        "event": "Received",
        "data": {
            "key": format!("received-{timestamp}"),
            "timestamp": timestamp,
            "bundle": {
                "txs": [],
                "block_number": "0x3e8",
                "max_timestamp": 1_700_000_100u64,
                "reverting_tx_hashes": [],
                "meter_bundle_response": meter_bundle_response,
            }
        }
    })
}

pub fn builder_included_event(timestamp: i64) -> Value {
    json!({
        "event": "BuilderIncluded",
        "data": {
            "key": format!("builder-{timestamp}"),
            "timestamp": timestamp,
            "builder": "op-rbuilder",
            "block_number": 1000,
            "flashblock_index": 1,
        }
    })
}

pub fn block_included_event(timestamp: i64, block_hash: B256) -> Value {
    json!({
        "event": "BlockIncluded",
        "data": {
            "key": format!("block-{timestamp}"),
            "timestamp": timestamp,
            "block_number": 1000,
            "block_hash": format!("{block_hash:?}"),
        }
    })
}

pub fn dropped_event(timestamp: i64) -> Value {
    json!({
        "event": "Dropped",
        "data": {
            "key": format!("dropped-{timestamp}"),
            "timestamp": timestamp,
            "reason": "TimedOut",
        }
    })
}

pub fn store_history(store: &InMemoryObjectStore, bundle_id: BundleId, events: Vec<Value>) {
    store.insert_json(&StorageKey::Bundle(bundle_id), &json!({ "history": events }));
}

/// Indexes `tx_hash` under `bundle_id` and records a `Received` event metering it.
pub fn store_bundle_for(
    store: &InMemoryObjectStore,
    bundle_id: BundleId,
    tx_hash: TxHash,
    execution_time_us: u64,
) {
    index_transaction(store, tx_hash, vec![bundle_id]);
    store_history(
        store,
        bundle_id,
        vec![received_event(
            10,
            Some(vec![(format!("{tx_hash:?}"), Some(execution_time_us))]),
        )],
    );
}

pub fn read_cached_block(store: &InMemoryObjectStore, hash: B256) -> Option<BlockRecord> {
    store
        .object(&StorageKey::Block(hash))
        .map(|content| serde_json::from_slice(&content).expect("cached block should decode"))
}
