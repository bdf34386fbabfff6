//! The single error kind raised by the interpreter.

use thiserror::Error;

/// Aborts an interpretation run. Carries the message and, when known, the
/// 1-based script line of the offending keyword.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", line_suffix(.line))]
pub struct ConfigurationError {
    pub message: String,
    pub line: Option<usize>,
}

impl ConfigurationError {
    pub fn new(message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }

    pub fn at(message: impl Into<String>, line: usize) -> Self {
        Self::new(message, Some(line))
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" (line {n})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_appends_line() {
        let test_cases = vec![
            (ConfigurationError::at("web is not allowed a block", 3), "web is not allowed a block (line 3)"),
            (ConfigurationError::new("bad", None), "bad"),
        ];

        for (err, expected) in test_cases {
            assert_eq!(err.to_string(), expected);
        }
    }
}
