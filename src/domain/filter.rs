use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::rule::{FIELD_NAMES, PTYPE_FIELD};

/// Comparison operator of a single filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
}

impl FilterOp {
    /// Operator tokens, two-character forms first so `<=` wins over `<`.
    const TOKENS: [(&'static str, FilterOp); 6] = [
        ("==", FilterOp::Eq),
        ("!=", FilterOp::NotEq),
        ("<=", FilterOp::Lte),
        (">=", FilterOp::Gte),
        ("<", FilterOp::Lt),
        (">", FilterOp::Gt),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::NotEq => "!=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
        }
    }

    /// Whether `ordering` (stored value compared to the operand) satisfies this operator.
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::NotEq => ordering != Ordering::Equal,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Lte => ordering != Ordering::Greater,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Gte => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error parsing a `field<op>value` clause.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("No comparison operator in filter: {0}")]
    MissingOperator(String),

    #[error("Empty field name in filter: {0}")]
    EmptyField(String),
}

/// One `(field, operator, value)` clause of a conjunctive store query.
///
/// A clause never matches a document whose field is null or absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        FieldFilter {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        FieldFilter::new(field, FilterOp::Eq, value)
    }

    /// Evaluate the clause against a stored field value.
    pub fn matches(&self, stored: Option<&str>) -> bool {
        match stored {
            Some(stored) => self.op.accepts(stored.cmp(self.value.as_str())),
            None => false,
        }
    }
}

impl fmt::Display for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.op, self.value)
    }
}

impl FromStr for FieldFilter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Leftmost operator wins; at equal positions the longer token is listed first.
        let mut found: Option<(usize, &str, FilterOp)> = None;
        for (token, op) in FilterOp::TOKENS {
            if let Some(pos) = s.find(token) {
                if found.map_or(true, |(best, _, _)| pos < best) {
                    found = Some((pos, token, op));
                }
            }
        }

        let Some((pos, token, op)) = found else {
            return Err(FilterParseError::MissingOperator(s.to_string()));
        };

        let field = s[..pos].trim();
        if field.is_empty() {
            return Err(FilterParseError::EmptyField(s.to_string()));
        }

        Ok(FieldFilter::new(field, op, s[pos + token.len()..].trim()))
    }
}

/// Build the clauses for a filtered delete.
///
/// `ptype` is always constrained. Each absolute position `p` in `v0..v5` gets an
/// equality clause against `field_values[p - field_index]` only when
/// `field_index <= p < field_index + field_values.len()`; every other position,
/// including values that would land outside `v0..v5`, is left unconstrained.
pub fn field_window_filters(
    ptype: &str,
    field_index: i32,
    field_values: &[String],
) -> Vec<FieldFilter> {
    let start = i64::from(field_index);
    let end = start + field_values.len() as i64;

    let mut filters = vec![FieldFilter::eq(PTYPE_FIELD, ptype)];
    for (position, name) in FIELD_NAMES.iter().enumerate() {
        let position = position as i64;
        if start <= position && position < end {
            let value = &field_values[(position - start) as usize];
            filters.push(FieldFilter::eq(*name, value.as_str()));
        }
    }
    filters
}
