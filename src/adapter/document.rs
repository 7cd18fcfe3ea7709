use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AdapterConfig;
use crate::domain::{field_window_filters, FieldFilter, RuleError, RuleRecord};
use crate::observability::MetricsRegistry;
use crate::policy::{PolicyModel, GROUPING_SECTION, POLICY_SECTION};
use crate::storage::{Document, DocumentStore, StoreError, WriteBatch};

use super::traits::{Adapter, AdapterError};

/// Policy adapter backed by one collection of a document store.
///
/// Each rule is one document. Batched operations commit through the
/// store's atomic batch; `add_policy` is a single point write.
pub struct DocumentAdapter {
    store: Arc<dyn DocumentStore>,
    collection: String,
    filtered: AtomicBool,
    metrics: Arc<MetricsRegistry>,
}

impl DocumentAdapter {
    pub fn new(store: Arc<dyn DocumentStore>, config: AdapterConfig) -> Self {
        DocumentAdapter {
            store,
            collection: config.collection,
            filtered: AtomicBool::new(false),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Create an adapter already marked as filtered.
    pub fn new_filtered(store: Arc<dyn DocumentStore>, config: AdapterConfig) -> Self {
        let adapter = DocumentAdapter::new(store, config);
        adapter.set_filtered();
        adapter
    }

    /// Share an existing metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Mark the adapter as filtered. The flag is never cleared.
    pub fn set_filtered(&self) {
        self.filtered.store(true, Ordering::Release);
    }

    /// Decode one stored document and feed its text line to `model`.
    pub fn load_policy_line(doc: Document, model: &mut dyn PolicyModel) -> Result<(), RuleError> {
        let record = RuleRecord::from_document(doc.id, doc.data)?;
        model.load_policy_line(&record.to_text_line());
        Ok(())
    }

    fn new_record(&self, ptype: &str, rule: &[String]) -> Result<RuleRecord, RuleError> {
        RuleRecord::from_rule(self.store.new_id(), ptype, rule)
    }

    fn encode(record: &RuleRecord) -> Result<Document, StoreError> {
        let data = serde_json::to_value(record.to_document())?;
        Ok(Document::new(record.id(), data))
    }

    /// Count failed store calls before handing the error back unchanged.
    fn observe<T>(&self, op: &'static str, result: Result<T, StoreError>) -> Result<T, StoreError> {
        if let Err(e) = &result {
            self.metrics.record_store_error();
            warn!(collection = %self.collection, op, error = %e, "Store operation failed");
        }
        result
    }

    async fn query(&self, filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError> {
        let result = self.store.query(&self.collection, filters).await;
        self.observe("query", result)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let result = self.store.commit(&self.collection, batch).await;
        self.observe("commit", result)
    }

    /// Run every query, then delete the union of their matches in one batch.
    async fn delete_matching(&self, queries: &[Vec<FieldFilter>]) -> Result<usize, StoreError> {
        let mut ids = BTreeSet::new();
        for filters in queries {
            ids.extend(self.query(filters).await?.into_iter().map(|doc| doc.id));
        }

        if ids.is_empty() {
            debug!(collection = %self.collection, "No matching rules to delete");
            return Ok(0);
        }

        let count = ids.len();
        let mut batch = WriteBatch::new();
        for id in ids {
            batch.delete(id);
        }
        self.commit(batch).await?;
        self.metrics.record_batch(0, count);

        Ok(count)
    }

    /// Encode rules and write them in one batch.
    async fn persist_batch(&self, records: &[RuleRecord]) -> Result<(), AdapterError> {
        if records.is_empty() {
            debug!(collection = %self.collection, "Nothing to persist");
            return Ok(());
        }

        let mut batch = WriteBatch::new();
        for record in records {
            batch.set(Self::encode(record)?);
        }
        self.commit(batch).await?;
        self.metrics.record_batch(records.len(), 0);

        Ok(())
    }
}

#[async_trait]
impl Adapter for DocumentAdapter {
    async fn load_policy(&self, model: &mut dyn PolicyModel) -> Result<(), AdapterError> {
        self.load_filtered_policy(model, &[]).await
    }

    async fn load_filtered_policy(
        &self,
        model: &mut dyn PolicyModel,
        filter: &[FieldFilter],
    ) -> Result<(), AdapterError> {
        if !filter.is_empty() {
            self.set_filtered();
        }

        // Every document must decode before the model sees any line.
        let records = self
            .query(filter)
            .await?
            .into_iter()
            .map(|doc| RuleRecord::from_document(doc.id, doc.data))
            .collect::<Result<Vec<_>, _>>()?;

        let count = records.len();
        for record in &records {
            model.load_policy_line(&record.to_text_line());
        }
        self.metrics.record_load(count);

        debug!(
            collection = %self.collection,
            clauses = filter.len(),
            count,
            "Loaded policy"
        );
        Ok(())
    }

    async fn save_policy(&self, model: &dyn PolicyModel) -> Result<(), AdapterError> {
        if self.is_filtered() {
            warn!(collection = %self.collection, "Saving policy from a filtered adapter");
        }

        let mut records = Vec::new();
        for sec in [POLICY_SECTION, GROUPING_SECTION] {
            for (ptype, rules) in model.assertions(sec) {
                for rule in rules {
                    records.push(self.new_record(ptype, rule)?);
                }
            }
        }

        self.persist_batch(&records).await?;

        info!(collection = %self.collection, count = records.len(), "Saved policy");
        Ok(())
    }

    async fn add_policy(
        &self,
        _sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<(), AdapterError> {
        let record = self.new_record(ptype, rule)?;
        let doc = Self::encode(&record)?;

        let result = self.store.set(&self.collection, doc).await;
        self.observe("set", result)?;
        self.metrics.record_point_write();

        debug!(collection = %self.collection, ptype, id = record.id(), "Added rule");
        Ok(())
    }

    async fn add_policies(
        &self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError> {
        let records = rules
            .iter()
            .map(|rule| self.new_record(ptype, rule))
            .collect::<Result<Vec<_>, _>>()?;

        self.persist_batch(&records).await?;

        debug!(collection = %self.collection, ptype, count = records.len(), "Added rules");
        Ok(())
    }

    async fn remove_policy(
        &self,
        _sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<usize, AdapterError> {
        let record = self.new_record(ptype, rule)?;
        let deleted = self.delete_matching(&[record.equality_filters()]).await?;

        debug!(collection = %self.collection, ptype, deleted, "Removed rule");
        Ok(deleted)
    }

    async fn remove_policies(
        &self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<usize, AdapterError> {
        let queries = rules
            .iter()
            .map(|rule| self.new_record(ptype, rule).map(|r| r.equality_filters()))
            .collect::<Result<Vec<_>, _>>()?;
        let deleted = self.delete_matching(&queries).await?;

        debug!(collection = %self.collection, ptype, deleted, "Removed rules");
        Ok(deleted)
    }

    async fn remove_filtered_policy(
        &self,
        _sec: &str,
        ptype: &str,
        field_index: i32,
        field_values: &[String],
    ) -> Result<usize, AdapterError> {
        let filters = field_window_filters(ptype, field_index, field_values);
        let deleted = self.delete_matching(&[filters]).await?;

        debug!(
            collection = %self.collection,
            ptype,
            field_index,
            deleted,
            "Removed filtered rules"
        );
        Ok(deleted)
    }

    fn is_filtered(&self) -> bool {
        self.filtered.load(Ordering::Acquire)
    }
}
