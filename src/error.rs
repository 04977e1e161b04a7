//! error type for card resolution

use thiserror::Error;

use crate::hass::RegistryError;
use crate::rules::RuleMatchError;
use crate::template::TemplateError;

/// a card field or entity could not be resolved
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Rule(#[from] RuleMatchError),

    /// the snapshot's area, device or entity registry is malformed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// the card config could not be turned into JSON for template discovery
    #[error("failed to serialize card config: {0}")]
    Serialize(#[from] serde_json::Error),

    /// failure while resolving a configured entity
    #[error("entity '{entity}': {source}")]
    Entity {
        entity: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// attach the entity being resolved
    pub fn in_entity(self, entity: impl Into<String>) -> Self {
        Error::Entity {
            entity: entity.into(),
            source: Box::new(self),
        }
    }

    /// innermost error, past any entity wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Entity { source, .. } => source.root(),
            other => other,
        }
    }

    /// template failure at the root, including one raised by a `template` rule
    pub fn template_error(&self) -> Option<&TemplateError> {
        match self.root() {
            Error::Template(e) => Some(e),
            Error::Rule(RuleMatchError::Template { source, .. }) => Some(source),
            _ => None,
        }
    }

    /// entity id whose lookup in the snapshot failed, past any wrappers
    pub fn missing_entity(&self) -> Option<&str> {
        self.template_error().and_then(TemplateError::missing_entity)
    }

    /// whether the failure is a lookup of an entity missing from the snapshot
    pub fn is_entity_not_found(&self) -> bool {
        self.missing_entity().is_some()
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
