pub mod document;
pub mod traits;

pub use document::DocumentAdapter;
pub use traits::{Adapter, AdapterError};
