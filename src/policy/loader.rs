use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::domain::split_line;

use super::model::{Model, PolicyModel};

/// Errors that can occur during policy file loading.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid policy line {line}: {reason}")]
    InvalidLine { line: usize, reason: String },
}

/// Parse policy text into a model.
///
/// Expected format: one `ptype, v0, v1, ...` rule per line, # for comments.
pub fn parse_policy(content: &str) -> Result<Model, PolicyError> {
    let mut model = Model::new();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        // Skip empty lines and comments
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        validate_line(trimmed).map_err(|reason| PolicyError::InvalidLine {
            line: idx + 1,
            reason,
        })?;

        model.load_policy_line(trimmed);
    }

    Ok(model)
}

/// Load a policy file (the same text format a file adapter reads).
pub fn load_policy_file(path: impl AsRef<Path>) -> Result<Model, PolicyError> {
    let content = fs::read_to_string(path)?;
    parse_policy(&content)
}

fn validate_line(line: &str) -> Result<(), String> {
    let tokens = split_line(line).map_err(|e| e.to_string())?;
    let mut tokens = tokens.iter();

    let ptype = tokens.next().map(String::as_str).unwrap_or_default();
    if ptype.is_empty() {
        return Err("missing ptype".to_string());
    }
    if !ptype.starts_with(['p', 'g']) {
        return Err(format!("unknown ptype {}", ptype));
    }

    let fields = tokens.count();
    if fields > crate::domain::MAX_FIELDS {
        return Err(format!("{} fields, at most {}", fields, crate::domain::MAX_FIELDS));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_policy_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
# RBAC policy
p, alice, data1, read
p, bob, data2, write
p, data2_admin, data2, read
p, data2_admin, data2, write

g, alice, data2_admin
"#
        )
        .unwrap();

        let model = load_policy_file(file.path()).unwrap();

        assert_eq!(model.get_policy().len(), 4);
        assert_eq!(
            model.get_grouping_policy(),
            &[vec!["alice".to_string(), "data2_admin".to_string()]]
        );
    }

    #[test]
    fn test_missing_file() {
        let result = load_policy_file("/nonexistent/policy.csv");
        assert!(matches!(result, Err(PolicyError::Io(_))));
    }

    #[test]
    fn test_unknown_ptype_rejected() {
        let result = parse_policy("p, alice, data1, read\nx, nope\n");

        match result {
            Err(PolicyError::InvalidLine { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("unknown ptype"));
            }
            other => panic!("expected InvalidLine, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_quote_rejected() {
        let result = parse_policy("p, \"alice, data1, read\n");

        match result {
            Err(PolicyError::InvalidLine { line, reason }) => {
                assert_eq!(line, 1);
                assert!(reason.contains("Unterminated"));
            }
            other => panic!("expected InvalidLine, got {:?}", other),
        }
    }

    #[test]
    fn test_quoted_comma_counts_as_one_field() {
        let model = parse_policy("p, \"a, b, c, d, e, f, g\", read\n").unwrap();
        assert_eq!(
            model.get_policy(),
            &[vec!["a, b, c, d, e, f, g".to_string(), "read".to_string()]]
        );
    }

    #[test]
    fn test_too_many_fields_rejected() {
        let result = parse_policy("p, a, b, c, d, e, f, g\n");
        assert!(result.unwrap_err().to_string().contains("at most 6"));
    }
}
