mod schema;

pub use schema::{
    Alignment, AlignmentConfig, CardConfig, EntityConfig, EntityEntry, EntitySection, EntityType,
};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde_json::{json, Value as JsonValue};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::hass::domain_of;
use crate::rules::RuleOperator;
use crate::template;

const CONFIG_ENV_VAR: &str = "ACARD_CONFIG";
const STATES_ENV_VAR: &str = "ACARD_STATES";

const ACARD_DIR: &str = ".acard";
const CONFIG_FILE: &str = "card.json5";
const STATES_FILE: &str = "states.json";

/// card config location: explicit path, then `ACARD_CONFIG`, then ~/.acard/card.json5
pub fn get_config_path(explicit: Option<&str>) -> Result<PathBuf> {
    resolve_path(explicit, CONFIG_ENV_VAR, CONFIG_FILE)
}

/// state snapshot location: explicit path, then `ACARD_STATES`, then ~/.acard/states.json
pub fn get_states_path(explicit: Option<&str>) -> Result<PathBuf> {
    resolve_path(explicit, STATES_ENV_VAR, STATES_FILE)
}

fn resolve_path(explicit: Option<&str>, env_var: &str, file_name: &str) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand(path));
    }

    if let Ok(path) = env::var(env_var) {
        if !path.trim().is_empty() {
            return Ok(expand(&path));
        }
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
    Ok(home.join(ACARD_DIR).join(file_name))
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path.trim()).to_string())
}

/// parse a card config from JSON5 text
pub fn parse(content: &str) -> Result<CardConfig> {
    let raw: JsonValue = json5::from_str(content).context("Invalid JSON5")?;

    if let Some(entities) = raw.get("entities") {
        if !entities.is_array() {
            return Err(anyhow!("Invalid configuration: 'entities' must be a list"));
        }
    }

    serde_json::from_value(raw).context("Invalid card configuration")
}

pub fn load(path: &Path) -> Result<CardConfig> {
    if !path.exists() {
        return Err(anyhow!(
            "Config file not found: {} (create one with 'acard config default')",
            path.display()
        ));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// verify a configuration file and return a list of problems
pub fn verify(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(anyhow!("config file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config = parse(&content)?;
    Ok(verify_config(&config))
}

/// problems in a parsed configuration that would fail or misbehave at render time
pub fn verify_config(config: &CardConfig) -> Vec<String> {
    let mut errors = Vec::new();

    for (i, entry) in config.entities.iter().flatten().enumerate() {
        let prefix = format!("entities[{}]", i);
        let entity = entry.to_config();

        if domain_of(&entity.entity).is_empty() {
            errors.push(format!(
                "{}: invalid entity id '{}': expected <domain>.<name>",
                prefix, entity.entity
            ));
        }

        if let Some(JsonValue::String(section)) = &entity.section {
            if !template::is_template(section)
                && !matches!(section.trim(), "auto" | "sensors" | "buttons" | "title")
            {
                errors.push(format!(
                    "{}: unknown section '{}': use auto, sensors, buttons or title",
                    prefix, section
                ));
            }
        }

        if let Some(JsonValue::String(entity_type)) = &entity.entity_type {
            if !template::is_template(entity_type)
                && !matches!(entity_type.trim(), "auto" | "sensor" | "button")
            {
                errors.push(format!(
                    "{}: unknown entity_type '{}': use auto, sensor or button",
                    prefix, entity_type
                ));
            }
        }

        for (j, rule) in entity.rules().iter().enumerate() {
            let prefix = format!("{}.state[{}]", prefix, j);

            match rule.operator() {
                RuleOperator::Unknown(op) => errors.push(format!(
                    "{}: unknown operator '{}': valid operators are <, <=, ==, >=, >, !=, regex, template, default",
                    prefix, op
                )),
                RuleOperator::Regex => {
                    let pattern = template::Value::from_json(&rule.value).to_string();
                    if let Err(e) = Regex::new(&pattern) {
                        errors.push(format!("{}: invalid regex '{}': {}", prefix, pattern, e));
                    }
                }
                RuleOperator::Template if !rule.value.is_string() => errors.push(format!(
                    "{}: operator 'template' expects a template string value",
                    prefix
                )),
                _ => {}
            }
        }
    }

    if let Some(align) = &config.align {
        let fields = [
            ("title", &align.title),
            ("sensors", &align.sensors),
            ("buttons", &align.buttons),
            ("title_entities", &align.title_entities),
        ];
        for (name, value) in fields {
            if let Some(JsonValue::String(s)) = value {
                if !template::is_template(s) && Alignment::parse(s).is_none() {
                    errors.push(format!(
                        "align.{}: unknown alignment '{}': use left, right or center",
                        name, s
                    ));
                }
            }
        }
    }

    match serde_json::to_value(config) {
        Ok(raw) => check_templates(&raw, "", &mut errors),
        Err(e) => errors.push(format!("failed to serialize config: {}", e)),
    }

    errors
}

/// report template syntax errors anywhere in the config
fn check_templates(value: &JsonValue, path: &str, errors: &mut Vec<String>) {
    match value {
        JsonValue::String(s) => {
            if let Err(e) = template::check_syntax(s) {
                errors.push(format!("{}: {}", path, e));
            }
        }
        JsonValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_templates(item, &format!("{}[{}]", path, i), errors);
            }
        }
        JsonValue::Object(map) => {
            for (key, item) in map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                check_templates(item, &child, errors);
            }
        }
        _ => {}
    }
}

/// generates an example card config
pub fn default_with_examples() -> CardConfig {
    let example = json!({
        "type": "custom:minimalistic-area-card",
        "title": "Kitchen",
        "icon": "mdi:silverware-fork-knife",
        "show_area_icon": true,
        "hide_unavailable": false,
        "align": {
            "title": "left",
            "sensors": "left",
            "buttons": "right",
            "title_entities": "right"
        },
        "entities": [
            "sensor.kitchen_temperature",
            {
                "entity": "light.kitchen",
                "icon": "${state == 'on' ? 'mdi:lightbulb' : 'mdi:lightbulb-off'}"
            },
            {
                "entity": "switch.coffee_maker",
                "state": [
                    { "value": "on", "color": "orange" },
                    { "value": "off", "operator": "default", "color": "grey" }
                ]
            },
            {
                "entity": "binary_sensor.kitchen_window",
                "section": "title",
                "hide": "${state == 'off'}"
            },
            {
                "entity": "sensor.kitchen_humidity",
                "state": [
                    { "value": 60, "operator": ">", "color": "red" },
                    { "value": "${user.name == 'guest'}", "operator": "template", "hide": true }
                ]
            }
        ]
    });

    serde_json::from_value(example).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_json5() {
        let config = parse(
            r#"{
                // comments and trailing commas are fine
                title: 'Terrace',
                entities: [
                    'sensor.terrace_temperature',
                    { entity: 'light.terrace', section: 'title', },
                ],
            }"#,
        )
        .unwrap();

        assert_eq!(config.title, Some(serde_json::json!("Terrace")));
        assert_eq!(config.entity_configs().len(), 2);
    }

    #[test]
    fn test_parse_rejects_non_list_entities() {
        let err = parse(r#"{ entities: "sensor.a" }"#).unwrap_err();
        assert!(err.to_string().contains("must be a list"));
    }

    #[test]
    fn test_parse_invalid_syntax() {
        assert!(parse("{ title: ").is_err());
    }

    #[test]
    fn test_default_with_examples_is_valid() {
        let config = default_with_examples();
        assert_eq!(config.title, Some(serde_json::json!("Kitchen")));
        assert_eq!(config.entity_configs().len(), 5);

        let errors = verify_config(&config);
        assert!(errors.is_empty(), "expected no errors, got: {:?}", errors);
    }

    #[test]
    fn test_verify_valid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("card.json5");

        let config = r#"{
            title: "${user.name}'s room",
            entities: [
                "sensor.temperature",
                { entity: "light.lamp", state: [ { value: "on", icon: "mdi:lamp" } ] },
                { entity: "sensor.power", state: [ { value: "^[0-9]+$", operator: "regex" } ] },
            ],
        }"#;

        fs::write(&path, config).unwrap();
        let errors = verify(&path).unwrap();

        assert!(errors.is_empty(), "expected no errors, got: {:?}", errors);
    }

    #[test]
    fn test_verify_unknown_operator() {
        let config = parse(
            r#"{ entities: [ { entity: "sensor.a", state: [ { value: 1, operator: "=~" } ] } ] }"#,
        )
        .unwrap();

        let errors = verify_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("entities[0].state[0]: unknown operator '=~'"));
    }

    #[test]
    fn test_verify_invalid_regex() {
        let config = parse(
            r#"{ entities: [ { entity: "sensor.a", state: [ { value: "(", operator: "regex" } ] } ] }"#,
        )
        .unwrap();

        let errors = verify_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("invalid regex '('"));
    }

    #[test]
    fn test_verify_template_syntax_error() {
        let config = parse(r#"{ entities: [ { entity: "light.a", hide: "${state ==}" } ] }"#).unwrap();

        let errors = verify_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("entities[0].hide: SyntaxError"));
    }

    #[test]
    fn test_verify_entity_and_section() {
        let config = parse(
            r#"{
                entities: [ "kitchen", { entity: "light.a", section: "sidebar" } ],
                align: { buttons: "middle" },
            }"#,
        )
        .unwrap();

        let errors = verify_config(&config);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("invalid entity id 'kitchen'"));
        assert!(errors[1].contains("unknown section 'sidebar'"));
        assert!(errors[2].contains("align.buttons"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("missing.json5")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = get_config_path(Some("/tmp/card.json5")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/card.json5"));

        let path = get_states_path(Some("~/states.json")).unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
    }
}
