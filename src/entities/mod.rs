//! Host-facing entities.
//!
//! An entity keeps only identifiers and construction-time labels. Every
//! read re-resolves into the latest published snapshot, and every command
//! goes through [`Coordinator::dispatch`](crate::coordinator::Coordinator::dispatch).

use std::sync::Arc;

use serde::Serialize;

use crate::config::Options;
use crate::store::SnapshotStore;
use crate::types::{Housing, Snapshot, Zone};

pub mod binary_sensor;
pub mod button;
pub mod climate;
pub mod number;
pub mod select;
pub mod sensor;
pub mod switch;
pub mod time;

pub use binary_sensor::PresenceSensor;
pub use button::RefreshButton;
pub use climate::{ClimateFeature, Thermostat};
pub use number::CustomTemperatureNumber;
pub use select::{ProgramSelect, ZoneScheduleSelect};
pub use sensor::{BatterySensor, DeviceSensor, HousingSensor, NextInstructionSensor};
pub use switch::{HousingSwitch, HousingSwitchKind, TemporarySwitch};
pub use time::OverrideDuration;

pub const MANUFACTURER: &str = "comap";

/// Device an entity is grouped under: the housing, or one of its zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub serial_number: Option<String>,
}

impl DeviceInfo {
    pub(crate) fn housing(housing: &Housing) -> Self {
        Self {
            identifier: housing.id.clone(),
            name: housing.name.clone(),
            manufacturer: MANUFACTURER,
            serial_number: None,
        }
    }

    pub(crate) fn zone(housing: &Housing, zone: &Zone) -> Self {
        Self {
            identifier: zone.id.clone(),
            name: format!("{} {}", housing.name, zone.title),
            manufacturer: MANUFACTURER,
            serial_number: Some(zone.id.clone()),
        }
    }
}

/// Host platform an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Climate,
    BinarySensor,
    Sensor,
    Select,
    Switch,
    Number,
    Button,
    Time,
}

/// Fields shared by every entity kind.
pub(crate) struct EntityBase {
    pub unique_id: String,
    pub name: String,
    pub device: DeviceInfo,
    pub store: Arc<SnapshotStore>,
}

impl EntityBase {
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.latest()
    }

    /// Resolve `zone_id` in the latest snapshot and project it.
    pub fn with_zone<T>(&self, zone_id: &str, f: impl FnOnce(&Zone, &Snapshot) -> Option<T>) -> Option<T> {
        let snapshot = self.snapshot();
        let zone = crate::mapping::zone_by_id(zone_id, &snapshot)?;
        f(zone, &snapshot)
    }
}

pub enum Entity {
    Thermostat(Thermostat),
    Presence(PresenceSensor),
    Battery(BatterySensor),
    Device(DeviceSensor),
    Housing(HousingSensor),
    NextInstruction(NextInstructionSensor),
    ZoneSchedule(ZoneScheduleSelect),
    Program(ProgramSelect),
    HousingSwitch(HousingSwitch),
    Temporary(TemporarySwitch),
    CustomTemperature(CustomTemperatureNumber),
    Refresh(RefreshButton),
    OverrideDuration(OverrideDuration),
}

impl Entity {
    fn base(&self) -> &EntityBase {
        match self {
            Entity::Thermostat(e) => &e.base,
            Entity::Presence(e) => &e.base,
            Entity::Battery(e) => &e.base,
            Entity::Device(e) => &e.base,
            Entity::Housing(e) => &e.base,
            Entity::NextInstruction(e) => &e.base,
            Entity::ZoneSchedule(e) => &e.base,
            Entity::Program(e) => &e.base,
            Entity::HousingSwitch(e) => &e.base,
            Entity::Temporary(e) => &e.base,
            Entity::CustomTemperature(e) => &e.base,
            Entity::Refresh(e) => &e.base,
            Entity::OverrideDuration(e) => &e.base,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.base().unique_id
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.base().device
    }

    /// Zone the entity is tied to, for zone-scoped kinds. Objects outside
    /// any zone report `None`.
    pub fn zone_id(&self) -> Option<&str> {
        match self {
            Entity::Thermostat(e) => Some(e.zone_id()),
            Entity::Presence(e) => Some(e.zone_id()),
            Entity::NextInstruction(e) => Some(e.zone_id()),
            Entity::ZoneSchedule(e) => Some(e.zone_id()),
            Entity::Temporary(e) => Some(e.zone_id()),
            Entity::OverrideDuration(e) => Some(e.zone_id()),
            Entity::Battery(e) => e.zone_id(),
            Entity::Device(e) => e.zone_id(),
            Entity::Housing(_)
            | Entity::Program(_)
            | Entity::HousingSwitch(_)
            | Entity::CustomTemperature(_)
            | Entity::Refresh(_) => None,
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Entity::Thermostat(_) => Platform::Climate,
            Entity::Presence(_) => Platform::BinarySensor,
            Entity::Battery(_)
            | Entity::Device(_)
            | Entity::Housing(_)
            | Entity::NextInstruction(_) => Platform::Sensor,
            Entity::ZoneSchedule(_) | Entity::Program(_) => Platform::Select,
            Entity::HousingSwitch(_) | Entity::Temporary(_) => Platform::Switch,
            Entity::CustomTemperature(_) => Platform::Number,
            Entity::Refresh(_) => Platform::Button,
            Entity::OverrideDuration(_) => Platform::Time,
        }
    }
}

/// Build every entity the snapshot currently describes.
pub fn build_entities(store: &Arc<SnapshotStore>, options: &Options) -> Vec<Entity> {
    let snapshot = store.latest();
    let housing = &snapshot.housing;
    let mut entities = Vec::new();

    for zone in snapshot.zones() {
        entities.push(Entity::Thermostat(Thermostat::new(
            store.clone(),
            housing,
            zone,
            options.assist_compatibility,
        )));
        if zone.last_presence_detected.is_some() {
            entities.push(Entity::Presence(PresenceSensor::new(
                store.clone(),
                housing,
                zone,
                options.presence_timeout,
            )));
        }
        entities.push(Entity::NextInstruction(NextInstructionSensor::new(
            store.clone(),
            housing,
            zone,
            options.time_zone,
        )));
        entities.push(Entity::ZoneSchedule(ZoneScheduleSelect::new(store.clone(), housing, zone)));
        entities.push(Entity::Temporary(TemporarySwitch::new(store.clone(), housing, zone)));
        entities.push(Entity::OverrideDuration(OverrideDuration::new(store.clone(), housing, zone)));
    }

    for object in &snapshot.connected_objects {
        if object.voltage_percent.is_some() {
            entities.push(Entity::Battery(BatterySensor::new(store.clone(), &snapshot, object)));
        }
        entities.push(Entity::Device(DeviceSensor::new(
            store.clone(),
            &snapshot,
            object,
            options.time_zone,
        )));
    }

    entities.push(Entity::Housing(HousingSensor::new(store.clone(), housing, options.time_zone)));
    entities.push(Entity::Program(ProgramSelect::new(store.clone(), housing)));
    for kind in HousingSwitchKind::ALL {
        entities.push(Entity::HousingSwitch(HousingSwitch::new(store.clone(), housing, kind)));
    }
    for temp in &snapshot.custom_temperatures {
        entities.push(Entity::CustomTemperature(CustomTemperatureNumber::new(
            store.clone(),
            housing,
            temp,
        )));
    }
    entities.push(Entity::Refresh(RefreshButton::new(store.clone(), housing)));

    entities
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_entities_for_every_kind() {
        let store = test_support::store();
        let entities = build_entities(&store, &Options::default());

        let count = |p: Platform| entities.iter().filter(|e| e.platform() == p).count();
        assert_eq!(count(Platform::Climate), 2);
        // only z1 reports a last presence
        assert_eq!(count(Platform::BinarySensor), 1);
        // 1 battery + 3 devices + housing + 2 next-instruction
        assert_eq!(count(Platform::Sensor), 7);
        assert_eq!(count(Platform::Select), 3);
        assert_eq!(count(Platform::Switch), 5);
        assert_eq!(count(Platform::Number), 4);
        assert_eq!(count(Platform::Button), 1);
        assert_eq!(count(Platform::Time), 2);
    }

    #[test]
    fn unique_ids_are_unique() {
        let store = test_support::store();
        let entities = build_entities(&store, &Options::default());
        let mut ids: Vec<_> = entities.iter().map(Entity::unique_id).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn zone_ids_follow_membership() {
        let store = test_support::store();
        let entities = build_entities(&store, &Options::default());
        let gateway = entities
            .iter()
            .find(|e| matches!(e, Entity::Device(d) if d.serial_number() == "SN-GW"))
            .unwrap();
        assert_eq!(gateway.zone_id(), None);
        assert_eq!(gateway.device_info().identifier, "h1");

        let thermostat = entities.iter().find(|e| e.unique_id() == "z1").unwrap();
        assert_eq!(thermostat.zone_id(), Some("z1"));
        assert_eq!(thermostat.device_info().name, "Maison Salon");
    }
}
