//! template evaluation errors

use std::fmt;

use thiserror::Error;

/// longest expression body quoted verbatim in an error
const MAX_EXCERPT_LEN: usize = 100;

/// characters kept when the body has to be truncated
const TRUNCATED_LEN: usize = 98;

/// kind of the underlying script error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// the body could not be parsed
    Syntax,
    /// a name outside the bindings was referenced
    Reference,
    /// an operation was applied to a value of the wrong type
    Type,
    /// a numeric argument was out of range
    Range,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax => write!(f, "SyntaxError"),
            ErrorKind::Reference => write!(f, "ReferenceError"),
            ErrorKind::Type => write!(f, "TypeError"),
            ErrorKind::Range => write!(f, "RangeError"),
        }
    }
}

/// error raised while parsing or running an expression body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub message: String,
    /// entity id whose lookup in the snapshot failed
    pub missing_entity: Option<String>,
}

impl ScriptError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            missing_entity: None,
        }
    }

    /// the bound entity is not in the snapshot
    pub fn entity_not_found(entity_id: &str, suggestions: &[String]) -> Self {
        let mut message = format!("entity '{}' not found in states", entity_id);
        if !suggestions.is_empty() {
            message.push_str(&format!(" (did you mean '{}'?)", suggestions.join("', '")));
        }
        Self {
            missing_entity: Some(entity_id.to_string()),
            ..Self::type_error(message)
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Reference, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Range, message)
    }
}

/// a template failed to evaluate
///
/// carries the original script error and an excerpt of the expression body
/// that was evaluated (after the implicit `return` was added).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{cause} in '{expression}'")]
pub struct TemplateError {
    #[source]
    pub cause: ScriptError,
    pub expression: String,
}

impl TemplateError {
    /// error name reported to the presentation layer
    pub const NAME: &'static str = "MinimalistAreaCardJSTemplateError";

    /// taxonomy kind of every template failure
    pub const KIND: &'static str = "TemplateEvaluationError";

    pub fn new(cause: ScriptError, body: &str) -> Self {
        Self {
            cause,
            expression: excerpt(body),
        }
    }

    /// kind of the underlying script error
    pub fn kind(&self) -> ErrorKind {
        self.cause.kind
    }

    /// entity id that was missing from the snapshot, if that caused the failure
    pub fn missing_entity(&self) -> Option<&str> {
        self.cause.missing_entity.as_deref()
    }
}

/// full trimmed body when short enough, otherwise the first 98 characters and `...`
fn excerpt(body: &str) -> String {
    if body.chars().count() <= MAX_EXCERPT_LEN {
        body.trim().to_string()
    } else {
        let head: String = body.chars().take(TRUNCATED_LEN).collect();
        format!("{}...", head)
    }
}
