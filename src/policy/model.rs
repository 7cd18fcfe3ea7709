use std::collections::BTreeMap;
use tracing::warn;

use crate::domain::{quote_field, split_line};

/// Section holding policy rules.
pub const POLICY_SECTION: &str = "p";

/// Section holding grouping (role) rules.
pub const GROUPING_SECTION: &str = "g";

/// The slice of a policy engine's model an adapter needs.
///
/// The engine owns rule semantics; an adapter only walks the rule
/// sections and feeds text lines back through the generic line loader.
pub trait PolicyModel: Send + Sync {
    /// Every assertion of section `sec` as `(ptype, rules)`.
    fn assertions(&self, sec: &str) -> Vec<(&str, &[Vec<String>])>;

    /// Parse one `ptype, v0, v1, ...` line into the model.
    fn load_policy_line(&mut self, line: &str);
}

/// Minimal in-memory policy model.
///
/// Assertions are keyed by ptype; the section is the ptype's first
/// character, so `p2` lives in section `p` and `g2` in section `g`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    sections: BTreeMap<String, BTreeMap<String, Vec<Vec<String>>>>,
}

impl Model {
    /// Create a model with the `p` and `g` assertions defined.
    pub fn new() -> Self {
        let mut model = Model::default();
        model.add_def(POLICY_SECTION, "p");
        model.add_def(GROUPING_SECTION, "g");
        model
    }

    /// Define an (empty) assertion `ptype` in section `sec`.
    pub fn add_def(&mut self, sec: &str, ptype: &str) {
        self.sections
            .entry(sec.to_string())
            .or_default()
            .entry(ptype.to_string())
            .or_default();
    }

    /// Append a rule. Returns false if an identical rule is already present.
    pub fn add_policy(&mut self, sec: &str, ptype: &str, rule: Vec<String>) -> bool {
        let rules = self
            .sections
            .entry(sec.to_string())
            .or_default()
            .entry(ptype.to_string())
            .or_default();

        if rules.contains(&rule) {
            return false;
        }
        rules.push(rule);
        true
    }

    /// Remove a rule. Returns false if it was not present.
    pub fn remove_policy(&mut self, sec: &str, ptype: &str, rule: &[String]) -> bool {
        let Some(rules) = self
            .sections
            .get_mut(sec)
            .and_then(|assertions| assertions.get_mut(ptype))
        else {
            return false;
        };

        let before = rules.len();
        rules.retain(|r| r.as_slice() != rule);
        rules.len() != before
    }

    /// Rules of a named assertion.
    pub fn get_named_policy(&self, sec: &str, ptype: &str) -> &[Vec<String>] {
        self.sections
            .get(sec)
            .and_then(|assertions| assertions.get(ptype))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rules of the default `p` assertion.
    pub fn get_policy(&self) -> &[Vec<String>] {
        self.get_named_policy(POLICY_SECTION, "p")
    }

    /// Rules of the default `g` assertion.
    pub fn get_grouping_policy(&self) -> &[Vec<String>] {
        self.get_named_policy(GROUPING_SECTION, "g")
    }

    /// Drop every rule, keeping assertion definitions.
    pub fn clear_policy(&mut self) {
        for assertions in self.sections.values_mut() {
            for rules in assertions.values_mut() {
                rules.clear();
            }
        }
    }

    /// Total number of rules across all sections.
    pub fn len(&self) -> usize {
        self.sections
            .values()
            .flat_map(|assertions| assertions.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every rule as a text line, sections and ptypes in key order.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for assertions in self.sections.values() {
            for (ptype, rules) in assertions {
                for rule in rules {
                    let mut line = ptype.clone();
                    for field in rule {
                        line.push_str(", ");
                        line.push_str(&quote_field(field));
                    }
                    lines.push(line);
                }
            }
        }
        lines
    }
}

impl PolicyModel for Model {
    fn assertions(&self, sec: &str) -> Vec<(&str, &[Vec<String>])> {
        self.sections
            .get(sec)
            .map(|assertions| {
                assertions
                    .iter()
                    .map(|(ptype, rules)| (ptype.as_str(), rules.as_slice()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn load_policy_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return;
        }

        let mut tokens = match split_line(line) {
            Ok(tokens) => tokens.into_iter(),
            Err(e) => {
                warn!(line, error = %e, "Skipping malformed policy line");
                return;
            }
        };
        let Some(ptype) = tokens.next().filter(|t| !t.is_empty()) else {
            warn!(line, "Skipping policy line without ptype");
            return;
        };

        let sec = &ptype[..ptype.chars().next().map_or(0, char::len_utf8)];
        if sec != POLICY_SECTION && sec != GROUPING_SECTION {
            warn!(ptype = %ptype, "Skipping policy line for unknown section");
            return;
        }

        let sec = sec.to_string();
        let rule: Vec<String> = tokens.collect();
        self.sections
            .entry(sec)
            .or_default()
            .entry(ptype)
            .or_default()
            .push(rule);
    }
}
