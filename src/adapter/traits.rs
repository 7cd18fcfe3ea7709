use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{FieldFilter, RuleError};
use crate::policy::PolicyModel;
use crate::storage::StoreError;

/// Errors returned by adapter operations.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Malformed rule: {0}")]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Storage capabilities a policy engine drives.
///
/// Loads feed text lines into the engine's model; mutations mirror edits
/// the running engine makes to its in-memory policy.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Load every stored rule into `model`.
    async fn load_policy(&self, model: &mut dyn PolicyModel) -> Result<(), AdapterError>;

    /// Load only rules matching every clause of `filter`.
    async fn load_filtered_policy(
        &self,
        model: &mut dyn PolicyModel,
        filter: &[FieldFilter],
    ) -> Result<(), AdapterError>;

    /// Persist every rule of the model's `p` and `g` sections in one atomic batch.
    async fn save_policy(&self, model: &dyn PolicyModel) -> Result<(), AdapterError>;

    /// Persist one rule.
    async fn add_policy(&self, sec: &str, ptype: &str, rule: &[String])
        -> Result<(), AdapterError>;

    /// Persist several rules in one atomic batch.
    async fn add_policies(
        &self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), AdapterError>;

    /// Delete every stored rule whose set fields equal `rule`. Returns the count deleted.
    async fn remove_policy(
        &self,
        sec: &str,
        ptype: &str,
        rule: &[String],
    ) -> Result<usize, AdapterError>;

    /// Delete every stored rule matching any of `rules`, in one atomic batch.
    async fn remove_policies(
        &self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<usize, AdapterError>;

    /// Delete rules whose fields from `field_index` onward equal `field_values`.
    async fn remove_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: i32,
        field_values: &[String],
    ) -> Result<usize, AdapterError>;

    /// Whether the adapter has served (or was built for) a partial load.
    fn is_filtered(&self) -> bool;
}
