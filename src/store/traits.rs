//! `MessageStore` trait — the persistence collaborator the pipeline sees.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::pipeline::types::MessageRecord;

/// Backend-agnostic document store for enriched message records.
///
/// The pipeline calls `insert` exactly once per processed event with the
/// record as a single self-contained document. No transactions, no query
/// interface — reads are a backend concern for inspection tooling.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist an enriched record. Returns the store-assigned document id.
    async fn insert(&self, record: &MessageRecord) -> Result<String, DatabaseError>;

    /// Number of documents stored.
    async fn count(&self) -> Result<u64, DatabaseError>;
}
