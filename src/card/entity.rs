//! per-entity display resolution

use serde::Serialize;
use tracing::debug;

use super::{get_or_default, get_str_or_default, resolve_text};
use crate::config::{EntityConfig, EntityType};
use crate::error::Result;
use crate::hass::{domain_of, EntityState};
use crate::rules::match_rules;
use crate::template::{format_number, string_to_number, EvalContext, Value};

/// state of an entity that the host could not reach
pub const UNAVAILABLE: &str = "unavailable";

/// states shown as inactive
pub const STATES_OFF: &[&str] = &[
    "closed",
    "locked",
    "off",
    UNAVAILABLE,
    "idle",
    "disconnected",
];

/// domains rendered as sensors
pub const SENSORS: &[&str] = &["sensor", "binary_sensor"];

/// domains toggled on tap instead of opening the more-info dialog
pub const DOMAINS_TOGGLE: &[&str] = &[
    "fan",
    "input_boolean",
    "light",
    "switch",
    "group",
    "automation",
    "humidifier",
];

/// what happens when the entity is tapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TapAction {
    MoreInfo,
    Toggle,
}

/// resolved display of a configured entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntityDisplay {
    Shown(EntityView),
    /// hidden by `hide`, a matched rule, or `hide_unavailable`
    Hidden { entity: String },
    /// missing from the snapshot or unavailable
    Unavailable { entity: String },
}

impl EntityDisplay {
    pub fn entity(&self) -> &str {
        match self {
            EntityDisplay::Shown(view) => &view.entity,
            EntityDisplay::Hidden { entity } | EntityDisplay::Unavailable { entity } => entity,
        }
    }

    pub fn is_shown(&self) -> bool {
        matches!(self, EntityDisplay::Shown(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub entity: String,
    pub name: String,
    /// tooltip: friendly name and raw state
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub active: bool,
    pub is_sensor: bool,
    pub show_state: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_text: Option<String>,
    pub tap_action: TapAction,
    /// index of the rule that supplied icon, color and hide
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<usize>,
}

/// value the rules of an entity are matched against
///
/// entities with a unit or a state class are numeric (null when the state is
/// not a number); otherwise the state string, with `unavailable` and `idle`
/// mapped to null.
pub fn current_value(state: &EntityState) -> Value<'static> {
    if state.is_numeric() {
        let n = string_to_number(&state.state);
        return if n.is_nan() {
            Value::Null
        } else {
            Value::Number(n)
        };
    }

    match state.state.as_str() {
        UNAVAILABLE | "idle" => Value::Null,
        other => Value::String(other.to_string()),
    }
}

/// text shown under a sensor
pub fn state_text(entity: &EntityConfig, state: &EntityState) -> Option<String> {
    if let Some(attribute) = &entity.attribute {
        let value = state
            .attributes
            .get(attribute)
            .map(Value::from_json)
            .filter(|v| !v.is_nullish())
            .map(|v| v.to_string());

        let parts: Vec<String> = [entity.prefix.clone(), value, entity.suffix.clone()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();
        return Some(parts.join(" "));
    }

    match current_value(state) {
        Value::Number(n) => {
            let number = format_number(n);
            Some(match state.unit() {
                Some(unit) if !unit.is_empty() => format!("{} {}", number, unit),
                _ => number,
            })
        }
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn is_active(state: &str) -> bool {
    !state.is_empty() && !STATES_OFF.contains(&state.to_lowercase().as_str())
}

/// resolve how an entity is displayed
pub fn resolve_entity(
    entity: &EntityConfig,
    hide_unavailable: bool,
    ctx: &EvalContext<'_>,
) -> Result<EntityDisplay> {
    resolve(entity, hide_unavailable, ctx).map_err(|e| e.in_entity(&entity.entity))
}

fn resolve(
    entity: &EntityConfig,
    hide_unavailable: bool,
    ctx: &EvalContext<'_>,
) -> Result<EntityDisplay> {
    let id = entity.entity.as_str();

    let state = match ctx.hass().state(id) {
        Some(state) if state.state != UNAVAILABLE => state,
        _ => {
            debug!(entity = id, hide_unavailable, "entity unavailable");
            let entity = id.to_string();
            return Ok(if hide_unavailable {
                EntityDisplay::Hidden { entity }
            } else {
                EntityDisplay::Unavailable { entity }
            });
        }
    };

    let domain = domain_of(id);

    let force_dialog =
        get_or_default(Some(id), entity.force_dialog.as_ref(), Value::Bool(false), ctx)?;
    let tap_action = if force_dialog.is_truthy() || !DOMAINS_TOGGLE.contains(&domain) {
        TapAction::MoreInfo
    } else {
        TapAction::Toggle
    };

    let show_state = entity.show_state.unwrap_or(domain != "binary_sensor");

    let entity_type = resolve_text(Some(id), entity.entity_type.as_ref(), ctx)?
        .map(|s| EntityType::parse(&s))
        .unwrap_or(EntityType::Auto);
    let is_sensor = entity_type == EntityType::Sensor || SENSORS.contains(&domain);

    let mut icon = get_or_default(Some(id), entity.icon.as_ref(), Value::Undefined, ctx)?;
    let mut color = get_or_default(Some(id), entity.color.as_ref(), Value::Undefined, ctx)?;
    let mut hide = get_or_default(Some(id), entity.hide.as_ref(), Value::Bool(false), ctx)?;
    let mut matched_rule = None;

    let rules = entity.rules();
    if !rules.is_empty() {
        let current = current_value(state);
        if let Some(rule) = match_rules(Some(id), rules, &current, ctx)? {
            icon = get_str_or_default(Some(id), rule.icon.as_deref(), icon, ctx)?;
            color = get_str_or_default(Some(id), rule.color.as_deref(), color, ctx)?;
            hide = get_or_default(Some(id), rule.hide.as_ref(), hide, ctx)?;
            matched_rule = rules.iter().position(|r| std::ptr::eq(r, rule));
        }
    }

    if hide.is_truthy() {
        return Ok(EntityDisplay::Hidden {
            entity: id.to_string(),
        });
    }

    let text = if is_sensor && show_state {
        state_text(entity, state)
    } else {
        None
    };

    Ok(EntityDisplay::Shown(EntityView {
        entity: id.to_string(),
        name: entity
            .name
            .clone()
            .unwrap_or_else(|| state.friendly_name().to_string()),
        title: format!("{}: {}", state.friendly_name(), state.state),
        icon: text_of(&icon),
        color: text_of(&color),
        active: is_active(&state.state),
        is_sensor,
        show_state,
        state_text: text,
        tap_action,
        matched_rule,
    }))
}

fn text_of(value: &Value<'_>) -> Option<String> {
    if value.is_nullish() {
        None
    } else {
        Some(value.to_string())
    }
}
