use std::borrow::Cow;
use thiserror::Error;

/// Error splitting a policy text line.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LineError {
    #[error("Unterminated quoted field")]
    UnterminatedQuote,

    #[error("Unexpected {0:?} after quoted field")]
    TextAfterQuote(char),
}

/// Quote a field for a policy line when it would not survive a plain split.
///
/// Fields holding `,`, `"`, a line break, or surrounding whitespace are wrapped
/// in double quotes with inner quotes doubled.
pub fn quote_field(value: &str) -> Cow<'_, str> {
    let needs_quotes = value.contains([',', '"', '\n', '\r'])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);

    if needs_quotes {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Split a `ptype, v0, v1, ...` line into tokens.
///
/// Unquoted tokens are trimmed. Quoted tokens keep their content verbatim;
/// whitespace around the quotes is ignored.
pub fn split_line(line: &str) -> Result<Vec<String>, LineError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        if chars.next_if_eq(&'"').is_some() {
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('"') if chars.next_if_eq(&'"').is_some() => value.push('"'),
                    Some('"') => break,
                    Some(c) => value.push(c),
                    None => return Err(LineError::UnterminatedQuote),
                }
            }
            tokens.push(value);

            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            match chars.next() {
                Some(',') => continue,
                Some(c) => return Err(LineError::TextAfterQuote(c)),
                None => break,
            }
        }

        let mut value = String::new();
        let mut last = true;
        for c in chars.by_ref() {
            if c == ',' {
                last = false;
                break;
            }
            value.push(c);
        }
        tokens.push(value.trim().to_string());
        if last {
            break;
        }
    }

    Ok(tokens)
}
