// src/storage/memory.rs
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

use crate::domain::FieldFilter;

use super::traits::{Document, DocumentStore, StoreError, WriteBatch, WriteOp};

type Collection = BTreeMap<String, serde_json::Value>;

/// In-process document store.
///
/// Batches are applied to a staged copy of the collection and swapped in
/// only on success, so a failed commit leaves nothing behind.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
    fail_after: Mutex<Option<usize>>,
    fail_query: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write fail after staging `ops` operations (for testing).
    ///
    /// A point write fails outright.
    pub fn fail_next_write_after(&self, ops: usize) {
        *self.fail_after.lock() = Some(ops);
    }

    /// Make the next query fail (for testing).
    pub fn fail_next_query(&self) {
        *self.fail_query.lock() = true;
    }

    /// Insert a raw document, bypassing any encoding (for testing).
    pub fn insert_raw(&self, collection: &str, id: impl Into<String>, data: serde_json::Value) {
        self.collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.into(), data);
    }

    /// Snapshot of every document in a collection, ordered by id.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn injected_failure(staged: usize) -> StoreError {
        StoreError::Unavailable(format!("injected failure after {} staged ops", staged))
    }
}

fn matches(data: &serde_json::Value, filters: &[FieldFilter]) -> bool {
    filters
        .iter()
        .all(|f| f.matches(data.get(f.field.as_str()).and_then(serde_json::Value::as_str)))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, StoreError> {
        if std::mem::take(&mut *self.fail_query.lock()) {
            return Err(StoreError::Unavailable("injected query failure".to_string()));
        }

        Ok(self
            .collections
            .lock()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| matches(data, filters))
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        if self.fail_after.lock().take().is_some() {
            return Err(Self::injected_failure(0));
        }

        self.collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id, doc.data);
        Ok(())
    }

    async fn commit(&self, collection: &str, batch: WriteBatch) -> Result<(), StoreError> {
        let fail_after = self.fail_after.lock().take();
        let mut collections = self.collections.lock();
        let mut staged = collections.get(collection).cloned().unwrap_or_default();

        for (applied, op) in batch.into_ops().into_iter().enumerate() {
            if fail_after == Some(applied) {
                return Err(Self::injected_failure(applied));
            }
            match op {
                WriteOp::Set(doc) => {
                    staged.insert(doc.id, doc.data);
                }
                WriteOp::Delete(id) => {
                    staged.remove(&id);
                }
            }
        }

        if let Some(limit) = fail_after {
            // Batch was shorter than the failure point; fail at commit time.
            return Err(Self::injected_failure(limit));
        }

        collections.insert(collection.to_string(), staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FilterOp;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_query() {
        let store = MemoryStore::new();
        store
            .set("rules", Document::new("a", json!({"ptype": "p", "v0": "alice"})))
            .await
            .unwrap();
        store
            .set("rules", Document::new("b", json!({"ptype": "g", "v0": "bob"})))
            .await
            .unwrap();

        let all = store.query("rules", &[]).await.unwrap();
        assert_eq!(all.len(), 2);

        let p = store
            .query("rules", &[FieldFilter::eq("ptype", "p")])
            .await
            .unwrap();
        assert_eq!(p, vec![Document::new("a", json!({"ptype": "p", "v0": "alice"}))]);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = MemoryStore::new();
        store.insert_raw("one", "a", json!({"ptype": "p"}));

        assert!(store.query("two", &[]).await.unwrap().is_empty());
        assert_eq!(store.len("one"), 1);
    }

    #[tokio::test]
    async fn test_null_field_never_matches() {
        let store = MemoryStore::new();
        store.insert_raw("rules", "a", json!({"ptype": "p", "v0": null}));

        let hits = store
            .query("rules", &[FieldFilter::new("v0", FilterOp::NotEq, "x")])
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_failed_query_is_one_shot() {
        let store = MemoryStore::new();
        store.insert_raw("rules", "a", json!({"ptype": "p"}));
        store.fail_next_query();

        let result = store.query("rules", &[]).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.query("rules", &[]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_applies_in_order() {
        let store = MemoryStore::new();
        store.insert_raw("rules", "a", json!({"ptype": "p"}));

        let mut batch = WriteBatch::new();
        batch
            .set(Document::new("b", json!({"ptype": "g"})))
            .delete("a")
            .delete("missing");
        store.commit("rules", batch).await.unwrap();

        let docs = store.documents("rules");
        assert_eq!(docs, vec![Document::new("b", json!({"ptype": "g"}))]);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_state_unchanged() {
        let store = MemoryStore::new();
        store.insert_raw("rules", "a", json!({"ptype": "p"}));
        store.fail_next_write_after(1);

        let mut batch = WriteBatch::new();
        batch
            .set(Document::new("b", json!({"ptype": "g"})))
            .delete("a");
        let result = store.commit("rules", batch).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(
            store.documents("rules"),
            vec![Document::new("a", json!({"ptype": "p"}))]
        );

        // Failure injection is one-shot.
        let mut batch = WriteBatch::new();
        batch.delete("a");
        store.commit("rules", batch).await.unwrap();
        assert_eq!(store.len("rules"), 0);
    }

    #[tokio::test]
    async fn test_failed_point_write() {
        let store = MemoryStore::new();
        store.fail_next_write_after(0);

        let result = store
            .set("rules", Document::new("a", json!({"ptype": "p"})))
            .await;
        assert!(result.is_err());
        assert_eq!(store.len("rules"), 0);
    }

    #[test]
    fn test_new_id_is_unique() {
        let store = MemoryStore::new();
        let a = store.new_id();
        let b = store.new_id();

        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }
}
