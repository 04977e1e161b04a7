//! command error types

use super::exit_codes;
use super::output::ErrorData;
use crate::error::Error as CardError;
use crate::rules::RuleMatchError;
use crate::template::{ErrorKind, TemplateError};

/// error returned by command execution
#[derive(Debug, Clone)]
pub struct CommandError {
    /// exit code (maps to JSON-RPC error code via -32000 - code)
    pub code: i32,
    pub message: String,
    /// suggested alternatives (e.g., similar entity ids)
    pub suggestions: Vec<String>,
    /// itemized problems, e.g. config verification errors
    pub details: Vec<String>,
    /// script error kind when a template failed
    pub template_kind: Option<ErrorKind>,
}

impl CommandError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            suggestions: Vec::new(),
            details: Vec::new(),
            template_kind: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self::new(exit_codes::ERROR, message)
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::new(exit_codes::INVALID_ARGS, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(exit_codes::CONFIG_ERROR, message)
    }

    pub fn states(message: impl Into<String>) -> Self {
        Self::new(exit_codes::STATES_ERROR, message)
    }

    pub fn entity_not_found(entity: &str, suggestions: Vec<String>) -> Self {
        Self::new(
            exit_codes::ENTITY_NOT_FOUND,
            format!("entity '{}' not found in states", entity),
        )
        .with_suggestions(suggestions)
    }

    /// a failed card resolution, classified by its innermost cause
    pub fn from_card(e: &CardError) -> Self {
        let code = if e.is_entity_not_found() {
            exit_codes::ENTITY_NOT_FOUND
        } else {
            match e.root() {
                CardError::Rule(_) => exit_codes::RULE_ERROR,
                CardError::Registry(_) => exit_codes::STATES_ERROR,
                CardError::Serialize(_) => exit_codes::ERROR,
                _ => exit_codes::TEMPLATE_ERROR,
            }
        };
        let mut error = Self::new(code, e.to_string());
        error.template_kind = e.template_error().map(TemplateError::kind);
        error
    }

    /// JSON-RPC error data: template error naming, suggestions and details
    pub fn error_data(&self) -> ErrorData {
        ErrorData {
            name: self.template_kind.map(|_| TemplateError::NAME),
            kind: self.template_kind.map(|_| TemplateError::KIND),
            cause: self.template_kind.map(|kind| kind.to_string()),
            suggestions: self.suggestions.clone(),
            details: self.details.clone(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<CardError> for CommandError {
    fn from(e: CardError) -> Self {
        Self::from_card(&e)
    }
}

impl From<TemplateError> for CommandError {
    fn from(e: TemplateError) -> Self {
        CardError::from(e).into()
    }
}

impl From<RuleMatchError> for CommandError {
    fn from(e: RuleMatchError) -> Self {
        CardError::from(e).into()
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(e: anyhow::Error) -> Self {
        CommandError::general(format!("{:#}", e))
    }
}
