use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for adapter activity.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Load operations (full and filtered)
    pub loads_total: AtomicU64,

    /// Documents decoded into a policy model
    pub rules_loaded_total: AtomicU64,

    /// Documents written (point writes and batches)
    pub rules_written_total: AtomicU64,

    /// Documents deleted
    pub rules_deleted_total: AtomicU64,

    /// Atomic batches committed
    pub batch_commits_total: AtomicU64,

    /// Store calls that returned an error
    pub store_errors_total: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        MetricsRegistry::default()
    }

    /// Record a completed load.
    pub fn record_load(&self, rules: usize) {
        self.loads_total.fetch_add(1, Ordering::Relaxed);
        self.rules_loaded_total
            .fetch_add(rules as u64, Ordering::Relaxed);
    }

    /// Record a committed batch.
    pub fn record_batch(&self, written: usize, deleted: usize) {
        self.batch_commits_total.fetch_add(1, Ordering::Relaxed);
        self.rules_written_total
            .fetch_add(written as u64, Ordering::Relaxed);
        self.rules_deleted_total
            .fetch_add(deleted as u64, Ordering::Relaxed);
    }

    /// Record a single-document write.
    pub fn record_point_write(&self) {
        self.rules_written_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed store call.
    pub fn record_store_error(&self) {
        self.store_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        format!(
            r#"# HELP rulestore_loads_total Policy load operations
# TYPE rulestore_loads_total counter
rulestore_loads_total {}

# HELP rulestore_rules_loaded_total Rules decoded into a policy model
# TYPE rulestore_rules_loaded_total counter
rulestore_rules_loaded_total {}

# HELP rulestore_rules_written_total Rule documents written
# TYPE rulestore_rules_written_total counter
rulestore_rules_written_total {}

# HELP rulestore_rules_deleted_total Rule documents deleted
# TYPE rulestore_rules_deleted_total counter
rulestore_rules_deleted_total {}

# HELP rulestore_batch_commits_total Atomic batches committed
# TYPE rulestore_batch_commits_total counter
rulestore_batch_commits_total {}

# HELP rulestore_store_errors_total Store calls that failed
# TYPE rulestore_store_errors_total counter
rulestore_store_errors_total {}
"#,
            self.loads_total.load(Ordering::Relaxed),
            self.rules_loaded_total.load(Ordering::Relaxed),
            self.rules_written_total.load(Ordering::Relaxed),
            self.rules_deleted_total.load(Ordering::Relaxed),
            self.batch_commits_total.load(Ordering::Relaxed),
            self.store_errors_total.load(Ordering::Relaxed),
        )
    }
}
