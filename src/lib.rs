pub mod adapter;
pub mod cli;
pub mod config;
pub mod domain;
pub mod observability;
pub mod policy;
pub mod storage;

pub use adapter::{Adapter, AdapterError, DocumentAdapter};
pub use config::{AdapterConfig, Config};
pub use domain::{FieldFilter, FilterOp, RuleRecord};
pub use policy::{Model, PolicyModel};
pub use storage::{DocumentStore, MemoryStore, PostgresStore};
