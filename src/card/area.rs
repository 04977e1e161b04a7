//! entities of an area, from the host's area, device and entity registries

use crate::hass::{Hass, RegistryEntity, RegistryError};

/// entity categories never shown on an area card
const HIDDEN_CATEGORIES: &[&str] = &["diagnostic", "config"];

/// entities assigned to `area_id`, directly or through their device
///
/// disabled, hidden and diagnostic/config entities are left out. an area
/// missing from the registry has no entities.
pub fn area_entities(hass: &Hass, area_id: &str) -> Result<Vec<String>, RegistryError> {
    let Some(area) = hass.area(area_id)? else {
        return Ok(Vec::new());
    };
    let devices = hass.devices()?;

    let in_area = |entry: &RegistryEntity| {
        let device_area = entry
            .device_id
            .as_ref()
            .and_then(|id| devices.get(id))
            .and_then(|device| device.area_id.as_deref());

        entry.area_id.as_deref() == Some(area.area_id.as_str())
            || device_area == Some(area.area_id.as_str())
    };

    Ok(hass
        .entity_registry()?
        .into_iter()
        .filter(|(_, entry)| is_listed(entry) && in_area(entry))
        .map(|(entity_id, _)| entity_id)
        .collect())
}

fn is_listed(entry: &RegistryEntity) -> bool {
    let disabled = entry.disabled_by.as_deref().is_some_and(|by| !by.is_empty());
    let hidden_category = entry
        .entity_category
        .as_deref()
        .is_some_and(|category| HIDDEN_CATEGORIES.contains(&category));

    !disabled && !entry.hidden.unwrap_or(false) && !hidden_category
}
