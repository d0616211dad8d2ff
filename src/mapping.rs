//! Pure lookups and translations over a [`Snapshot`].
//!
//! Every function here is stateless: callers re-resolve identifiers against
//! the latest snapshot on each access. Collections are small (one housing,
//! tens of zones and objects), so lookups are plain linear scans.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

use crate::types::*;
use crate::{Error, Result};

// -- Zone / object lookup --

pub fn zone_by_id<'a>(zone_id: &str, snapshot: &'a Snapshot) -> Option<&'a Zone> {
    snapshot.zones().iter().find(|z| z.id == zone_id)
}

pub fn object_by_serial<'a>(serial: &str, snapshot: &'a Snapshot) -> Option<&'a ConnectedObject> {
    snapshot
        .connected_objects
        .iter()
        .find(|o| o.serial_number == serial)
}

/// Zone claiming a connected object. Both fields are `None` for objects
/// not tied to any zone, such as the gateway. A serial listed by several
/// zones belongs to the last of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoneOwner<'a> {
    pub id: Option<&'a str>,
    pub title: Option<&'a str>,
}

pub fn zone_owning_object<'a>(serial: &str, snapshot: &'a Snapshot) -> ZoneOwner<'a> {
    snapshot
        .zones()
        .iter()
        .rfind(|z| z.connected_objects.iter().any(|s| s == serial))
        .map(|z| ZoneOwner {
            id: Some(z.id.as_str()),
            title: Some(z.title.as_str()),
        })
        .unwrap_or_default()
}

// -- Schedules and programs --

pub fn schedule_options(snapshot: &Snapshot) -> Vec<&str> {
    snapshot.schedules.iter().map(|s| s.title.as_str()).collect()
}

pub fn schedule_id_by_title<'a>(title: &str, snapshot: &'a Snapshot) -> Option<&'a str> {
    snapshot
        .schedules
        .iter()
        .find(|s| s.title == title)
        .map(|s| s.id.as_str())
}

/// Title of the schedule the active program assigns to a zone.
pub fn active_schedule_title<'a>(zone_id: &str, snapshot: &'a Snapshot) -> Option<&'a str> {
    let schedule_id = snapshot
        .active_program
        .zones
        .iter()
        .find(|z| z.id == zone_id)?
        .schedule_id
        .as_str();
    snapshot
        .schedules
        .iter()
        .find(|s| s.id == schedule_id)
        .map(|s| s.title.as_str())
}

pub fn program_options(snapshot: &Snapshot) -> Vec<&str> {
    snapshot.programs.iter().map(|p| p.title.as_str()).collect()
}

pub fn program_id_by_title<'a>(title: &str, snapshot: &'a Snapshot) -> Option<&'a str> {
    snapshot
        .programs
        .iter()
        .find(|p| p.title == title)
        .map(|p| p.id.as_str())
}

pub fn active_program_title(snapshot: &Snapshot) -> Option<&str> {
    snapshot
        .programs
        .iter()
        .find(|p| p.is_activated)
        .map(|p| p.title.as_str())
}

// -- Presets and HVAC modes --

pub fn vendor_to_preset(token: &str) -> Result<Preset> {
    Preset::from_vendor_token(token).ok_or_else(|| Error::InvalidValue {
        what: "vendor instruction",
        value: token.to_string(),
    })
}

pub fn preset_to_vendor(label: &str) -> Result<&'static str> {
    Preset::from_label(label)
        .map(|p| p.vendor_token())
        .ok_or_else(|| Error::InvalidValue {
            what: "preset",
            value: label.to_string(),
        })
}

/// Operating mode of a zone. A temporary override always reads as HEAT;
/// otherwise the housing heating state decides, with `on` shown as AUTO
/// (or HEAT under the assist compatibility profile).
pub fn hvac_mode(zone: &Zone, assist_compatibility: bool) -> Option<HvacMode> {
    if zone.temporary_instruction().is_some() {
        return Some(HvacMode::Heat);
    }
    match zone.heating_system_state {
        None | Some(HeatingSystemState::Off) => Some(HvacMode::Off),
        Some(HeatingSystemState::On) if assist_compatibility => Some(HvacMode::Heat),
        Some(HeatingSystemState::On) => Some(HvacMode::Auto),
        Some(HeatingSystemState::Unknown) => None,
    }
}

pub fn hvac_action(zone: &Zone) -> HvacAction {
    if zone.heating_system_state == Some(HeatingSystemState::Off) {
        return HvacAction::Idle;
    }
    match zone.heating_status.as_deref() {
        Some("heating") => HvacAction::Heating,
        _ => HvacAction::Idle,
    }
}

/// Look a defined-temperature key up in the flat table, then `connected`,
/// then `smart`.
pub fn resolve_defined_temperature(key: &str, temperatures: &CustomTemperatures) -> Option<f64> {
    temperatures
        .flat(key)
        .or_else(|| temperatures.sub_table("connected", key))
        .or_else(|| temperatures.sub_table("smart", key))
}

/// Target temperature shown for a zone. Defined-temperature zones whose key
/// resolves nowhere read as `0.0`; pilot-wire zones have none.
pub fn resolve_target_temperature(zone: &Zone, temperatures: &CustomTemperatures) -> Option<f64> {
    let instruction = zone.instruction();
    match zone.set_point_type {
        SetPointType::CustomTemperature => instruction.and_then(|i| match i {
            Instruction::Temperature(t) => Some(*t),
            Instruction::Token(s) => s.parse().ok(),
        }),
        SetPointType::DefinedTemperature => Some(
            instruction
                .map(Instruction::to_string)
                .and_then(|key| resolve_defined_temperature(&key, temperatures))
                .unwrap_or(0.0),
        ),
        SetPointType::PilotWire | SetPointType::Unknown => None,
    }
}

// -- Presence --

/// `now - last < interval`; equal instants are not present.
pub fn is_present(now: DateTime<Utc>, last: DateTime<Utc>, interval: Duration) -> bool {
    let elapsed = now.signed_duration_since(last);
    match TimeDelta::from_std(interval) {
        Ok(limit) => elapsed < limit,
        Err(_) => true,
    }
}

// -- Custom temperatures --

const FIXED_SLOTS: [(&str, &str); 3] = [
    ("night", "Night"),
    ("away", "Away"),
    ("frost_protection", "Frost protection"),
];

const PRESENCE_SLOTS: usize = 4;

pub fn derive_custom_temperatures(temperatures: &CustomTemperatures) -> Vec<CustomTemperature> {
    let fixed = FIXED_SLOTS
        .iter()
        .filter(|(id, _)| temperatures.0.contains_key(*id))
        .map(|(id, name)| CustomTemperature {
            id: id.to_string(),
            name: name.to_string(),
            value: temperatures.flat(id),
            icon: custom_temperature_icon(id),
        });

    let presence = (1..=PRESENCE_SLOTS).filter_map(|n| {
        let id = format!("presence_{n}");
        let value = temperatures.sub_table("connected", &id)?;
        Some(CustomTemperature {
            name: format!("Presence {n}"),
            value: Some(value),
            icon: custom_temperature_icon(&id),
            id,
        })
    });

    fixed.chain(presence).collect()
}

pub fn custom_temperature<'a>(slot: &str, snapshot: &'a Snapshot) -> Option<&'a CustomTemperature> {
    snapshot.custom_temperatures.iter().find(|t| t.id == slot)
}

// -- Next instruction --

/// The next scheduled instruction of a zone, with defined-temperature keys
/// replaced by their temperature when known.
pub fn next_instruction_value(zone: &Zone, snapshot: &Snapshot) -> Option<Instruction> {
    let raw = zone.next_timeslot.as_ref()?.set_point.instruction.as_ref()?;
    if zone.set_point_type == SetPointType::DefinedTemperature
        && let Some(value) = custom_temperature(&raw.to_string(), snapshot).and_then(|t| t.value)
    {
        return Some(Instruction::Temperature(value));
    }
    Some(raw.clone())
}

pub fn next_instruction_icon(zone: &Zone, snapshot: &Snapshot) -> &'static str {
    let Some(raw) = zone
        .next_timeslot
        .as_ref()
        .and_then(|t| t.set_point.instruction.as_ref())
    else {
        return "mdi:help";
    };
    match zone.set_point_type {
        SetPointType::PilotWire => mode_icon(raw.as_token().and_then(Preset::from_vendor_token)),
        SetPointType::DefinedTemperature => custom_temperature(&raw.to_string(), snapshot)
            .map(|t| t.icon)
            .unwrap_or("mdi:help"),
        _ => "mdi:help",
    }
}

// -- Time --

pub fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

pub fn format_hhmm(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

// -- Icons and names --

pub fn mode_icon(preset: Option<Preset>) -> &'static str {
    match preset {
        Some(Preset::Off) => "mdi:power-standby",
        Some(Preset::Away) => "mdi:account-arrow-right",
        Some(Preset::Eco) => "mdi:leaf",
        Some(Preset::Comfort | Preset::ComfortMinus1 | Preset::ComfortMinus2) => "mdi:sofa",
        None => "mdi:help",
    }
}

pub fn model_icon(model: &str) -> &'static str {
    match model {
        "gateway" => "mdi:network",
        "heating_module" => "mdi:access-point",
        "thermostat" => "mdi:home-thermometer",
        _ => "mdi:help-rhombus",
    }
}

pub fn custom_temperature_icon(slot: &str) -> &'static str {
    match slot {
        "night" => "mdi:weather-night",
        "away" => "mdi:account-arrow-right",
        "frost_protection" => "mdi:snowflake",
        s if s.starts_with("presence_") => "mdi:account-clock",
        _ => "mdi:thermometer",
    }
}

pub fn build_name(zone_name: Option<&str>, entity_name: Option<&str>) -> String {
    let parts: Vec<&str> = [zone_name, entity_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        "no_name_entity".to_string()
    } else {
        parts.join(" ")
    }
}
