pub mod loader;
pub mod model;

pub use loader::{load_policy_file, parse_policy, PolicyError};
pub use model::{Model, PolicyModel, GROUPING_SECTION, POLICY_SECTION};
