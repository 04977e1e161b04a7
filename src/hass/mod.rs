//! read-only snapshot of the home-automation host state
//!
//! the host owns and mutates its state store; acard only ever sees a snapshot,
//! either handed over by the presentation layer or loaded from a JSON file:
//!
//! ```json
//! {
//!   "states": {
//!     "binary_sensor.night": { "state": "off", "attributes": {} }
//!   },
//!   "user": { "name": "test user" }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use strsim::levenshtein;
use thiserror::Error;

/// entity id -> entity state
pub type StateStore = BTreeMap<String, EntityState>;

/// maximum edit distance for entity id suggestions
const SUGGESTION_THRESHOLD: usize = 3;

/// state record of a single entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// filled from the state store key when missing in the snapshot
    #[serde(default)]
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_changed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl EntityState {
    /// create a state record with no attributes
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            ..Self::default()
        }
    }

    /// add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// domain part of the entity id ("sensor" for "sensor.kitchen")
    pub fn domain(&self) -> &str {
        domain_of(&self.entity_id)
    }

    /// friendly name attribute, falling back to the entity id
    pub fn friendly_name(&self) -> &str {
        self.attributes
            .get("friendly_name")
            .and_then(JsonValue::as_str)
            .unwrap_or(&self.entity_id)
    }

    /// unit of measurement attribute
    pub fn unit(&self) -> Option<&str> {
        self.attributes
            .get("unit_of_measurement")
            .and_then(JsonValue::as_str)
    }

    /// numeric entities report a unit or a state class
    pub fn is_numeric(&self) -> bool {
        let present = |key: &str| {
            self.attributes
                .get(key)
                .map(|v| !v.is_null() && v != &JsonValue::String(String::new()))
                .unwrap_or(false)
        };
        present("unit_of_measurement") || present("state_class")
    }
}

/// area registry entry (`hass.areas`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// filled from the registry key when missing
    #[serde(default)]
    pub area_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// entity registry entry (`hass.entities`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// `diagnostic`, `config` or none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_category: Option<String>,
}

/// device registry entry (`hass.devices`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
}

/// a registry in the snapshot does not have the expected shape
#[derive(Debug, Error)]
#[error("invalid '{registry}' registry in state snapshot: {source}")]
pub struct RegistryError {
    pub registry: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// domain part of an entity id
pub fn domain_of(entity_id: &str) -> &str {
    entity_id.split_once('.').map(|(d, _)| d).unwrap_or("")
}

/// snapshot of the host state visible to templates as `hass`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hass {
    #[serde(default)]
    pub states: StateStore,
    /// signed-in user, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<JsonValue>,
    /// any other host fields (areas, entities, devices, language, ...) as
    /// templates see them; the registries are read through [`Hass::area`] and friends
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Hass {
    /// create a snapshot from a set of states
    pub fn new(states: impl IntoIterator<Item = EntityState>) -> Self {
        Self {
            states: states
                .into_iter()
                .map(|s| (s.entity_id.clone(), s))
                .collect(),
            ..Self::default()
        }
    }

    /// set the user identity
    pub fn with_user(mut self, user: JsonValue) -> Self {
        self.user = Some(user);
        self
    }

    /// add a host field other than `states` and `user`, e.g. a registry
    pub fn with_extra(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// parse a snapshot from JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut hass: Hass =
            serde_json::from_str(content).context("Failed to parse state snapshot")?;
        hass.fill_entity_ids();

        hass.areas()?;
        hass.entity_registry()?;
        hass.devices()?;

        Ok(hass)
    }

    /// load a snapshot from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state snapshot: {}", path.display()))?;

        Self::from_json_str(&content)
            .with_context(|| format!("Invalid state snapshot: {}", path.display()))
    }

    /// look up an entity state
    pub fn state(&self, entity_id: &str) -> Option<&EntityState> {
        self.states.get(entity_id)
    }

    /// entity ids close to an unknown one, nearest first
    pub fn suggest_entities(&self, entity_id: &str) -> Vec<String> {
        let query = entity_id.to_lowercase();

        let mut matches: Vec<(&String, usize)> = self
            .states
            .keys()
            .map(|id| (id, levenshtein(&query, &id.to_lowercase())))
            .filter(|(_, distance)| *distance <= SUGGESTION_THRESHOLD)
            .collect();

        matches.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        matches.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// area registry, keyed by area id
    pub fn areas(&self) -> Result<BTreeMap<String, Area>, RegistryError> {
        let mut areas: BTreeMap<String, Area> = self.registry("areas")?;
        for (id, area) in areas.iter_mut() {
            if area.area_id.is_empty() {
                area.area_id = id.clone();
            }
        }
        Ok(areas)
    }

    /// look up an area
    pub fn area(&self, area_id: &str) -> Result<Option<Area>, RegistryError> {
        Ok(self.areas()?.remove(area_id))
    }

    /// entity registry, keyed by entity id
    pub fn entity_registry(&self) -> Result<BTreeMap<String, RegistryEntity>, RegistryError> {
        self.registry("entities")
    }

    /// device registry, keyed by device id
    pub fn devices(&self) -> Result<BTreeMap<String, Device>, RegistryError> {
        self.registry("devices")
    }

    fn registry<T: DeserializeOwned>(
        &self,
        name: &'static str,
    ) -> Result<BTreeMap<String, T>, RegistryError> {
        match self.extra.get(name) {
            None | Some(JsonValue::Null) => Ok(BTreeMap::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|source| RegistryError { registry: name, source }),
        }
    }

    fn fill_entity_ids(&mut self) {
        for (id, state) in self.states.iter_mut() {
            if state.entity_id.is_empty() {
                state.entity_id = id.clone();
            }
        }
    }
}
