use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::rules::ConditionalRule;

/// area card configuration
///
/// fields typed as `JsonValue` accept a literal or a template string.
/// unknown fields (image, tap_action, ...) are kept so that entities
/// referenced from templates anywhere in the card can be discovered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<JsonValue>,
    /// area whose entities are shown when `entities` is not configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    /// background image, defaults to the area picture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_area_icon: Option<JsonValue>,
    #[serde(default)]
    pub hide_unavailable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<AlignmentConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<EntityEntry>>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl CardConfig {
    /// configured entities in order, plain ids expanded
    pub fn entity_configs(&self) -> Vec<EntityConfig> {
        self.entities
            .iter()
            .flatten()
            .map(EntityEntry::to_config)
            .collect()
    }
}

/// alignment of the card sections; each value may be a template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensors: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_entities: Option<JsonValue>,
}

/// an entry of `entities`: a bare entity id or a full entity config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityEntry {
    Id(String),
    Config(EntityConfig),
}

impl EntityEntry {
    pub fn entity_id(&self) -> &str {
        match self {
            EntityEntry::Id(id) => id,
            EntityEntry::Config(config) => &config.entity,
        }
    }

    pub fn to_config(&self) -> EntityConfig {
        match self {
            EntityEntry::Id(id) => EntityConfig::new(id.clone()),
            EntityEntry::Config(config) => config.clone(),
        }
    }
}

/// per-entity configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<JsonValue>,
    /// boolean or template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_state: Option<bool>,
    /// attribute shown instead of the state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// section name or template, see [`EntitySection`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<JsonValue>,
    /// entity type or template, see [`EntityType`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<JsonValue>,
    /// open the more-info dialog on tap even for toggleable entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_dialog: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Vec<ConditionalRule>>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl EntityConfig {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }

    /// conditional rules, empty when none are configured
    pub fn rules(&self) -> &[ConditionalRule] {
        self.state.as_deref().unwrap_or_default()
    }
}

/// where an entity is shown on the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitySection {
    Auto,
    Sensors,
    Buttons,
    Title,
}

impl EntitySection {
    /// parse a section name; anything unknown is `Auto`
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "sensors" => EntitySection::Sensors,
            "buttons" => EntitySection::Buttons,
            "title" => EntitySection::Title,
            _ => EntitySection::Auto,
        }
    }
}

/// how an entity is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Auto,
    Sensor,
    Button,
}

impl EntityType {
    /// parse an entity type; anything unknown is `Auto`
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "sensor" => EntityType::Sensor,
            "button" => EntityType::Button,
            _ => EntityType::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
    Center,
}

impl Alignment {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "left" => Some(Alignment::Left),
            "right" => Some(Alignment::Right),
            "center" => Some(Alignment::Center),
            _ => None,
        }
    }
}
