use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::filter::FieldFilter;
use super::line::quote_field;

/// Maximum number of value fields a rule may carry (`v0`..`v5`).
pub const MAX_FIELDS: usize = 6;

/// Wire names of the value slots, in positional order.
pub const FIELD_NAMES: [&str; MAX_FIELDS] = ["v0", "v1", "v2", "v3", "v4", "v5"];

/// Wire name of the type tag.
pub const PTYPE_FIELD: &str = "ptype";

/// Errors raised while encoding or decoding a rule.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Rule has {count} fields, at most 6 are supported")]
    TooManyFields { count: usize },

    #[error("Document {id} sets {field} while an earlier field is unset")]
    NonContiguous { id: String, field: &'static str },

    #[error("Document {id} has no ptype")]
    MissingPtype { id: String },

    #[error("Document {id} could not be decoded: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Stored shape of a rule: a type tag plus six optional string slots.
///
/// Unset slots serialize as `null`, never as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default)]
    pub ptype: Option<String>,
    #[serde(default)]
    pub v0: Option<String>,
    #[serde(default)]
    pub v1: Option<String>,
    #[serde(default)]
    pub v2: Option<String>,
    #[serde(default)]
    pub v3: Option<String>,
    #[serde(default)]
    pub v4: Option<String>,
    #[serde(default)]
    pub v5: Option<String>,
}

impl RuleDocument {
    fn into_slots(self) -> (Option<String>, [Option<String>; MAX_FIELDS]) {
        (
            self.ptype,
            [self.v0, self.v1, self.v2, self.v3, self.v4, self.v5],
        )
    }
}

/// One persisted policy tuple.
///
/// The set slots always form a contiguous prefix of `v0..v5`; both
/// constructors reject anything else, so a record never holds a gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    id: String,
    ptype: String,
    values: [Option<String>; MAX_FIELDS],
}

impl RuleRecord {
    /// Build a record from an engine tuple, assigning it the given store id.
    pub fn from_rule(
        id: impl Into<String>,
        ptype: impl Into<String>,
        rule: &[String],
    ) -> Result<Self, RuleError> {
        if rule.len() > MAX_FIELDS {
            return Err(RuleError::TooManyFields { count: rule.len() });
        }

        let mut values: [Option<String>; MAX_FIELDS] = Default::default();
        for (slot, value) in values.iter_mut().zip(rule) {
            *slot = Some(value.clone());
        }

        Ok(RuleRecord {
            id: id.into(),
            ptype: ptype.into(),
            values,
        })
    }

    /// Decode a stored document. Null or absent slots become unset fields.
    pub fn from_document(id: impl Into<String>, data: serde_json::Value) -> Result<Self, RuleError> {
        let id = id.into();
        let doc: RuleDocument = match serde_json::from_value(data) {
            Ok(doc) => doc,
            Err(source) => return Err(RuleError::Decode { id, source }),
        };

        let (ptype, values) = doc.into_slots();
        let Some(ptype) = ptype else {
            return Err(RuleError::MissingPtype { id });
        };

        // Once a slot is unset, every later slot must be unset too.
        let mut seen_gap = false;
        for (slot, value) in values.iter().enumerate() {
            match (value.is_some(), seen_gap) {
                (false, _) => seen_gap = true,
                (true, true) => {
                    return Err(RuleError::NonContiguous {
                        id,
                        field: FIELD_NAMES[slot],
                    })
                }
                (true, false) => {}
            }
        }

        Ok(RuleRecord { id, ptype, values })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ptype(&self) -> &str {
        &self.ptype
    }

    /// Value at absolute position `index`, if set.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// The set fields, in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map_while(|v| v.as_deref())
    }

    /// The rule tuple this record encodes.
    pub fn to_rule(&self) -> Vec<String> {
        self.fields().map(str::to_string).collect()
    }

    /// Wire document for this record.
    pub fn to_document(&self) -> RuleDocument {
        let [v0, v1, v2, v3, v4, v5] = self.values.clone();
        RuleDocument {
            ptype: Some(self.ptype.clone()),
            v0,
            v1,
            v2,
            v3,
            v4,
            v5,
        }
    }

    /// Equality predicates over `ptype` and every set field.
    ///
    /// Unset fields are left unconstrained.
    pub fn equality_filters(&self) -> Vec<FieldFilter> {
        let mut filters = vec![FieldFilter::eq(PTYPE_FIELD, self.ptype.as_str())];
        filters.extend(
            self.fields()
                .enumerate()
                .map(|(i, value)| FieldFilter::eq(FIELD_NAMES[i], value)),
        );
        filters
    }

    /// Policy text line: `ptype, v0, v1, ...` with unset trailing fields omitted.
    ///
    /// Fields that would not survive a plain split are double-quoted.
    pub fn to_text_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ptype)?;
        for value in self.fields() {
            write!(f, ", {}", quote_field(value))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_rule_fills_prefix() {
        let record = RuleRecord::from_rule("id1", "p", &rule(&["alice", "data1", "read"])).unwrap();

        assert_eq!(record.id(), "id1");
        assert_eq!(record.ptype(), "p");
        assert_eq!(record.field(0), Some("alice"));
        assert_eq!(record.field(2), Some("read"));
        assert_eq!(record.field(3), None);
        assert_eq!(record.to_rule(), rule(&["alice", "data1", "read"]));
    }

    #[test]
    fn test_from_rule_rejects_seven_fields() {
        let result = RuleRecord::from_rule("id1", "p", &rule(&["a", "b", "c", "d", "e", "f", "g"]));

        assert!(matches!(result, Err(RuleError::TooManyFields { count: 7 })));
    }

    #[test]
    fn test_document_serializes_nulls() {
        let record = RuleRecord::from_rule("id1", "g", &rule(&["alice", "admin"])).unwrap();
        let value = serde_json::to_value(record.to_document()).unwrap();

        assert_eq!(
            value,
            json!({
                "ptype": "g",
                "v0": "alice",
                "v1": "admin",
                "v2": null,
                "v3": null,
                "v4": null,
                "v5": null,
            })
        );
    }

    #[test]
    fn test_from_document_absent_fields_are_unset() {
        let record =
            RuleRecord::from_document("abc", json!({"ptype": "p", "v0": "bob", "v1": null})).unwrap();

        assert_eq!(record.id(), "abc");
        assert_eq!(record.to_rule(), rule(&["bob"]));
    }

    #[test]
    fn test_from_document_rejects_gap() {
        let result = RuleRecord::from_document("abc", json!({"ptype": "p", "v0": "bob", "v2": "read"}));

        match result {
            Err(RuleError::NonContiguous { id, field }) => {
                assert_eq!(id, "abc");
                assert_eq!(field, "v2");
            }
            other => panic!("expected NonContiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_from_document_requires_ptype() {
        let result = RuleRecord::from_document("abc", json!({"v0": "bob"}));
        assert!(matches!(result, Err(RuleError::MissingPtype { .. })));
    }

    #[test]
    fn test_from_document_rejects_non_string_field() {
        let result = RuleRecord::from_document("abc", json!({"ptype": "p", "v0": 42}));
        assert!(matches!(result, Err(RuleError::Decode { .. })));
    }

    #[test]
    fn test_text_line() {
        let record = RuleRecord::from_rule("id1", "p", &rule(&["alice", "data1", "read"])).unwrap();
        assert_eq!(record.to_text_line(), "p, alice, data1, read");

        let bare = RuleRecord::from_rule("id2", "p", &[]).unwrap();
        assert_eq!(bare.to_text_line(), "p");
    }

    #[test]
    fn test_equality_filters_skip_unset_fields() {
        let record = RuleRecord::from_rule("id1", "p", &rule(&["role", "res"])).unwrap();
        let filters = record.equality_filters();

        assert_eq!(
            filters,
            vec![
                FieldFilter::eq("ptype", "p"),
                FieldFilter::eq("v0", "role"),
                FieldFilter::eq("v1", "res"),
            ]
        );
    }
}
