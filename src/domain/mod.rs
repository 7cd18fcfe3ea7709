pub mod filter;
pub mod line;
pub mod rule;

pub use filter::{field_window_filters, FieldFilter, FilterOp, FilterParseError};
pub use line::{quote_field, split_line, LineError};
pub use rule::{RuleDocument, RuleError, RuleRecord, FIELD_NAMES, MAX_FIELDS, PTYPE_FIELD};
