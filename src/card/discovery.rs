//! discovery of entities referenced from templates
//!
//! a card re-renders when any entity it shows changes; entities that only
//! appear inside templates (`${hass.states['light.a'].state}`) are found by
//! scanning every template string of the configuration.

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::hass::Hass;
use crate::template::is_template;

lazy_static::lazy_static! {
    /// quoted entity ids of the domains templates usually read from
    static ref TEMPLATED_ENTITY: Regex = Regex::new(
        r#"(?i)["']((input_([^.]+)|(binary_)?sensor|number|switch|fan|light|climate)\.[a-z_]+)["']"#
    )
    .expect("templated entity pattern is valid");
}

/// entities referenced by templates anywhere in `config`
///
/// only ids present in the snapshot are kept; each id is reported once, in
/// the order it is first found.
pub fn templated_entities(config: &JsonValue, hass: &Hass) -> Vec<String> {
    let mut found = Vec::new();
    collect(config, hass, &mut found);
    found
}

fn collect(value: &JsonValue, hass: &Hass, found: &mut Vec<String>) {
    match value {
        JsonValue::String(s) if is_template(s) => {
            for captures in TEMPLATED_ENTITY.captures_iter(s.trim()) {
                let Some(id) = captures.get(1).map(|m| m.as_str()) else {
                    continue;
                };
                if hass.state(id).is_some() && !found.iter().any(|f| f == id) {
                    found.push(id.to_string());
                }
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                collect(item, hass, found);
            }
        }
        JsonValue::Object(map) => {
            for item in map.values() {
                collect(item, hass, found);
            }
        }
        _ => {}
    }
}
