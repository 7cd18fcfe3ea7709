// src/storage/traits.rs
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::FieldFilter;

/// Errors surfaced by a document store. Adapters pass these through unchanged.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A stored document: a store-assigned key plus its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: serde_json::Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: serde_json::Value) -> Self {
        Document {
            id: id.into(),
            data,
        }
    }
}

/// A single mutation inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or overwrite a document.
    Set(Document),
    /// Delete a document by id. Deleting a missing id is not an error.
    Delete(String),
}

/// Ordered set of mutations committed all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, doc: Document) -> &mut Self {
        self.ops.push(WriteOp::Set(doc));
        self
    }

    pub fn delete(&mut self, id: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Delete(id.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Document store operations used by the policy adapter.
///
/// Every call is one round trip; no call retries on failure.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Mint a fresh document id.
    fn new_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// All documents in `collection` matching every filter.
    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, StoreError>;

    /// Single-document upsert.
    async fn set(&self, collection: &str, doc: Document) -> Result<(), StoreError>;

    /// Apply a batch atomically: either every op is visible or none is.
    async fn commit(&self, collection: &str, batch: WriteBatch) -> Result<(), StoreError>;
}
