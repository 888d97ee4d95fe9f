pub mod block;
pub mod cache;
pub mod config;
pub mod enrichment;
pub mod history;
pub mod logger;
pub mod metrics;
pub mod service;
pub mod source;
pub mod storage;
pub mod types;

pub use block::{BlockRecord, BlockSummary, TransactionRecord};
pub use cache::{BlockCacheConfig, BlockEnrichmentCache};
pub use config::{Config, S3ConfigType};
pub use enrichment::{BundleEnrichmentResolver, BundleSelector, Enrichment, FirstBundle};
pub use history::{BundleHistoryStore, TransactionIndex};
pub use service::{BundleHistoryView, ExplorerService, TransactionHistory};
pub use source::{BlockSource, RpcBlockSource, SourceBlock, SourceTransaction};
pub use storage::{Decoded, InMemoryObjectStore, ObjectStore, S3ObjectStore, StorageKey};
pub use types::{
    BundleEventData, BundleEventKind, BundleHistory, BundleHistoryEvent, BundleId,
    BundleSnapshot, MeterBundleResponse, TransactionMetadata, TransactionResult,
};
