//! Error types for merge and schema-transform operations.

use std::fmt;

use thiserror::Error;

/// Context shared by all error kinds: a human message, the JSON Pointer of
/// the offending node, and the merge strategy that raised the error.
///
/// The string form is `'<strategy>' merge strategy: <message>: <reference>`,
/// trimmed when fields are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorDetail {
    pub message: String,
    pub reference: Option<String>,
    pub strategy: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorDetail {
            message: message.into(),
            reference: None,
            strategy: None,
        }
    }

    /// Attach the pointer of the offending node.
    pub fn at(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Attach the name of the strategy that raised the error.
    pub fn for_strategy(mut self, name: impl Into<String>) -> Self {
        self.strategy = Some(name.into());
        self
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(strategy) = &self.strategy {
            write!(f, "'{}' merge strategy: ", strategy)?;
        }
        f.write_str(&self.message)?;
        if let Some(reference) = &self.reference {
            write!(f, ": {}", reference)?;
        }
        Ok(())
    }
}

/// Errors surfaced by [`Merger`](crate::Merger) operations.
///
/// All three kinds abort the current walk; partial results are discarded.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MergeError {
    /// The head document violates a strategy's precondition (wrong type,
    /// duplicate ids, zero or multiple `oneOf` matches).
    #[error("{0}")]
    HeadInstance(ErrorDetail),

    /// The base document violates a precondition (wrong type, non-unique
    /// ids, malformed version history).
    #[error("{0}")]
    BaseInstance(ErrorDetail),

    /// The schema itself is ill-formed for the requested operation (unknown
    /// strategy, invalid `objClass`, ambiguous `anyOf`/`allOf`, bad `$ref`).
    #[error("{0}")]
    Schema(ErrorDetail),
}

impl MergeError {
    pub fn detail(&self) -> &ErrorDetail {
        match self {
            MergeError::HeadInstance(d) | MergeError::BaseInstance(d) | MergeError::Schema(d) => d,
        }
    }

    /// The JSON Pointer of the offending node, if known.
    pub fn reference(&self) -> Option<&str> {
        self.detail().reference.as_deref()
    }

    /// The strategy that raised the error, if any.
    pub fn strategy(&self) -> Option<&str> {
        self.detail().strategy.as_deref()
    }
}
