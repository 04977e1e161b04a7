//! card resolution
//!
//! turns a card configuration and a state snapshot into everything the card
//! needs to draw itself: title, area icon, alignment and the resolved display
//! of every entity, split into the title, sensors and buttons sections.
//! nothing here renders; the output is plain data.

mod area;
mod discovery;
mod entity;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

pub use area::area_entities;
pub use discovery::templated_entities;
pub use entity::{
    current_value, resolve_entity, state_text, EntityDisplay, EntityView, TapAction,
    DOMAINS_TOGGLE, SENSORS, STATES_OFF, UNAVAILABLE,
};

use crate::config::{Alignment, CardConfig, EntityConfig, EntitySection};
use crate::error::{Error, Result};
use crate::hass::domain_of;
use crate::template::{self, EvalContext, TemplateError, Value};

/// resolve a configuration field that may hold a template
///
/// absent or null fields give `default`, strings are evaluated (plain strings
/// come back unchanged), any other value is used as is.
pub fn get_or_default<'a>(
    entity: Option<&str>,
    field: Option<&'a JsonValue>,
    default: Value<'a>,
    ctx: &EvalContext<'a>,
) -> Result<Value<'a>, TemplateError> {
    match field {
        None | Some(JsonValue::Null) => Ok(default),
        Some(JsonValue::String(s)) => template::evaluate(entity, s, ctx),
        Some(other) => Ok(Value::from_json(other)),
    }
}

/// [`get_or_default`] for fields that are always strings
pub fn get_str_or_default<'a>(
    entity: Option<&str>,
    field: Option<&str>,
    default: Value<'a>,
    ctx: &EvalContext<'a>,
) -> Result<Value<'a>, TemplateError> {
    match field {
        None => Ok(default),
        Some(s) => template::evaluate(entity, s, ctx),
    }
}

/// resolved field as text, `None` when absent or nullish
pub(crate) fn resolve_text(
    entity: Option<&str>,
    field: Option<&JsonValue>,
    ctx: &EvalContext<'_>,
) -> Result<Option<String>, TemplateError> {
    let value = get_or_default(entity, field, Value::Undefined, ctx)?;
    Ok((!value.is_nullish()).then(|| value.to_string()))
}

/// section an entity is shown in
///
/// `auto` (or an unknown section) puts sensors and entities showing an
/// attribute in `sensors`, everything else in `buttons`.
pub fn entity_section(entity: &EntityConfig, ctx: &EvalContext<'_>) -> Result<EntitySection> {
    let section = resolve_text(Some(&entity.entity), entity.section.as_ref(), ctx)
        .map_err(|e| Error::from(e).in_entity(&entity.entity))?
        .map(|s| EntitySection::parse(&s))
        .unwrap_or(EntitySection::Auto);

    if section != EntitySection::Auto {
        return Ok(section);
    }

    if SENSORS.contains(&domain_of(&entity.entity)) || entity.attribute.is_some() {
        Ok(EntitySection::Sensors)
    } else {
        Ok(EntitySection::Buttons)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlignmentView {
    pub title: Alignment,
    pub sensors: Alignment,
    pub buttons: Alignment,
    pub title_entities: Alignment,
}

impl Default for AlignmentView {
    fn default() -> Self {
        Self {
            title: Alignment::Left,
            sensors: Alignment::Left,
            buttons: Alignment::Right,
            title_entities: Alignment::Right,
        }
    }
}

/// fully resolved card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub title: String,
    /// area icon, only when configured and `show_area_icon` holds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// background image, the configured one or the area picture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub align: AlignmentView,
    /// rows taken by the card
    pub size: usize,
    pub title_entities: Vec<EntityDisplay>,
    pub sensors: Vec<EntityDisplay>,
    pub buttons: Vec<EntityDisplay>,
    /// entities read by templates; a change to any of them re-renders the card
    pub templated_entities: Vec<String>,
}

/// resolve a card against the snapshot in `ctx`
///
/// with an `area` that exists in the snapshot, the card lists the area's
/// entities unless `entities` is configured, and the area icon is used when
/// no icon is configured. a configured icon is always shown for an area card.
pub fn render_card(config: &CardConfig, ctx: &EvalContext<'_>) -> Result<CardView> {
    let title = resolve_text(None, config.title.as_ref(), ctx)?.unwrap_or_default();

    let area = match config.area.as_deref() {
        Some(area_id) => ctx.hass().area(area_id)?,
        None => None,
    };

    let icon_configured = match &config.icon {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::String(s)) => !s.is_empty(),
        Some(_) => true,
    };
    let area_icon = match &area {
        Some(area) if !icon_configured => area.icon.clone().map(JsonValue::String),
        _ => None,
    };
    let icon_field = area_icon.as_ref().or(config.icon.as_ref());

    let show_icon = if area.is_some() && icon_configured {
        Value::Bool(true)
    } else {
        get_or_default(None, config.show_area_icon.as_ref(), Value::Bool(false), ctx)?
    };
    let icon = resolve_text(None, icon_field, ctx)?
        .filter(|icon| !icon.trim().is_empty() && show_icon.is_truthy());

    let image = config
        .image
        .clone()
        .or_else(|| area.as_ref().and_then(|area| area.picture.clone()));

    let align = resolve_alignment(config, ctx)?;

    let mut title_entities = Vec::new();
    let mut sensors = Vec::new();
    let mut buttons = Vec::new();

    let entities = match (&config.entities, config.area.as_deref(), &area) {
        (None, Some(area_id), Some(_)) => area_entities(ctx.hass(), area_id)?
            .into_iter()
            .map(EntityConfig::new)
            .collect(),
        _ => config.entity_configs(),
    };
    debug!(area = ?config.area, count = entities.len(), "resolving entities");

    for entity in entities {
        let section = entity_section(&entity, ctx)?;
        let resolved = resolve_entity(&entity, config.hide_unavailable, ctx)?;
        debug!(entity = %entity.entity, ?section, shown = resolved.is_shown(), "resolved entity");

        match section {
            EntitySection::Sensors => sensors.push(resolved),
            EntitySection::Title => title_entities.push(resolved),
            _ => buttons.push(resolved),
        }
    }

    let size = 1 + usize::from(!sensors.is_empty()) + usize::from(!buttons.is_empty());

    let templated = templated_entities(&serde_json::to_value(config)?, ctx.hass());

    Ok(CardView {
        title,
        icon,
        image,
        align,
        size,
        title_entities,
        sensors,
        buttons,
        templated_entities: templated,
    })
}

fn resolve_alignment(config: &CardConfig, ctx: &EvalContext<'_>) -> Result<AlignmentView> {
    let mut view = AlignmentView::default();
    let Some(align) = &config.align else {
        return Ok(view);
    };

    let fields = [
        (&align.title, &mut view.title),
        (&align.sensors, &mut view.sensors),
        (&align.buttons, &mut view.buttons),
        (&align.title_entities, &mut view.title_entities),
    ];
    for (field, slot) in fields {
        if let Some(alignment) = resolve_text(None, field.as_ref(), ctx)?
            .as_deref()
            .and_then(Alignment::parse)
        {
            *slot = alignment;
        }
    }

    Ok(view)
}
