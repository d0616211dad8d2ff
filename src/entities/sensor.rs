use std::sync::Arc;

use chrono_tz::Tz;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{DeviceInfo, EntityBase, MANUFACTURER};
use crate::mapping;
use crate::store::SnapshotStore;
use crate::types::*;

pub const UNIT_PERCENT: &str = "%";

fn object_device(snapshot: &Snapshot, zone_id: Option<&str>, zone_title: &str) -> DeviceInfo {
    let identifier = zone_id.unwrap_or(snapshot.housing.id.as_str()).to_string();
    DeviceInfo {
        name: format!("{} {}", snapshot.housing.name, zone_title)
            .trim()
            .to_string(),
        manufacturer: MANUFACTURER,
        serial_number: Some(identifier.clone()),
        identifier,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// -- Battery --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryAttributes {
    pub voltage: Option<f64>,
    pub voltage_status: Option<String>,
}

pub struct BatterySensor {
    pub(crate) base: EntityBase,
    serial_number: String,
    zone_id: Option<String>,
}

impl BatterySensor {
    pub(crate) fn new(store: Arc<SnapshotStore>, snapshot: &Snapshot, object: &ConnectedObject) -> Self {
        let owner = mapping::zone_owning_object(&object.serial_number, snapshot);
        let zone_title = owner.title.unwrap_or("");
        let scope = owner.id.unwrap_or(snapshot.housing.id.as_str());
        let name = [
            "Battery",
            object.model.as_str(),
            zone_title,
            snapshot.housing.name.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

        Self {
            base: EntityBase {
                unique_id: format!(
                    "{}_{}_battery_{}_{}",
                    snapshot.housing.id, scope, object.model, object.serial_number
                ),
                name,
                device: object_device(snapshot, owner.id, zone_title),
                store,
            },
            serial_number: object.serial_number.clone(),
            zone_id: owner.id.map(str::to_string),
        }
    }

    pub fn zone_id(&self) -> Option<&str> {
        self.zone_id.as_deref()
    }

    pub fn device_class(&self) -> &'static str {
        "battery"
    }

    pub fn unit_of_measurement(&self) -> &'static str {
        UNIT_PERCENT
    }

    pub fn state(&self) -> Option<f64> {
        let snapshot = self.base.snapshot();
        mapping::object_by_serial(&self.serial_number, &snapshot)?.voltage_percent
    }

    pub fn attributes(&self) -> Option<BatteryAttributes> {
        let snapshot = self.base.snapshot();
        let object = mapping::object_by_serial(&self.serial_number, &snapshot)?;
        Some(BatteryAttributes {
            voltage: object.voltage,
            voltage_status: object.voltage_status.clone(),
        })
    }
}

// -- Device --

/// Communication status of a connected object.
pub struct DeviceSensor {
    pub(crate) base: EntityBase,
    serial_number: String,
    model: String,
    zone_id: Option<String>,
    time_zone: Tz,
}

impl DeviceSensor {
    pub(crate) fn new(
        store: Arc<SnapshotStore>,
        snapshot: &Snapshot,
        object: &ConnectedObject,
        time_zone: Tz,
    ) -> Self {
        let owner = mapping::zone_owning_object(&object.serial_number, snapshot);
        let zone_title = owner.title.unwrap_or("");
        let scope = owner.id.unwrap_or(snapshot.housing.id.as_str());

        Self {
            base: EntityBase {
                unique_id: format!(
                    "{}_{}_{}_{}",
                    snapshot.housing.id, scope, object.model, object.serial_number
                ),
                name: format!("{} {}", capitalize(&object.model), zone_title)
                    .trim()
                    .to_string(),
                device: object_device(snapshot, owner.id, zone_title),
                store,
            },
            serial_number: object.serial_number.clone(),
            model: object.model.clone(),
            zone_id: owner.id.map(str::to_string),
            time_zone,
        }
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn zone_id(&self) -> Option<&str> {
        self.zone_id.as_deref()
    }

    pub fn icon(&self) -> &'static str {
        mapping::model_icon(&self.model)
    }

    pub fn state(&self) -> Option<String> {
        let snapshot = self.base.snapshot();
        mapping::object_by_serial(&self.serial_number, &snapshot)?
            .communication_status
            .clone()
    }

    /// Every field the vendor reports for the object, plus the local time
    /// of the snapshot.
    pub fn attributes(&self) -> Option<Map<String, Value>> {
        let snapshot = self.base.snapshot();
        let object = mapping::object_by_serial(&self.serial_number, &snapshot)?;
        let mut attrs = match serde_json::to_value(object) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        attrs.insert(
            "automatic_update_value".to_string(),
            Value::String(snapshot.fetched_at.with_timezone(&self.time_zone).to_rfc3339()),
        );
        Some(attrs)
    }
}

// -- Housing --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HousingAttributes {
    pub automatic_update_value: String,
    pub address: Option<Value>,
}

pub struct HousingSensor {
    pub(crate) base: EntityBase,
    time_zone: Tz,
}

impl HousingSensor {
    pub(crate) fn new(store: Arc<SnapshotStore>, housing: &Housing, time_zone: Tz) -> Self {
        Self {
            base: EntityBase {
                unique_id: format!("{}_sensor", housing.id),
                name: format!("Infos {}", housing.name),
                device: DeviceInfo {
                    serial_number: Some(housing.id.clone()),
                    ..DeviceInfo::housing(housing)
                },
                store,
            },
            time_zone,
        }
    }

    pub fn state(&self) -> Option<Value> {
        self.base.snapshot().thermal.services_available.clone()
    }

    pub fn attributes(&self) -> HousingAttributes {
        let snapshot = self.base.snapshot();
        HousingAttributes {
            automatic_update_value: snapshot
                .fetched_at
                .with_timezone(&self.time_zone)
                .to_rfc3339(),
            address: snapshot.housing.address.clone(),
        }
    }
}

// -- Next instruction --

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextInstructionAttributes {
    /// Start of the next timeslot, `HH:MM` in the reference time zone.
    pub next_timeslot: Option<String>,
    pub next_instruction: Option<Instruction>,
}

pub struct NextInstructionSensor {
    pub(crate) base: EntityBase,
    zone_id: String,
    time_zone: Tz,
}

impl NextInstructionSensor {
    pub(crate) fn new(store: Arc<SnapshotStore>, housing: &Housing, zone: &Zone, time_zone: Tz) -> Self {
        Self {
            base: EntityBase {
                unique_id: format!("{}_next_instruction", zone.id),
                name: format!("{} {} Next instruction", housing.name, zone.title),
                device: DeviceInfo::zone(housing, zone),
                store,
            },
            zone_id: zone.id.clone(),
            time_zone,
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn state(&self) -> Option<Instruction> {
        self.base
            .with_zone(&self.zone_id, mapping::next_instruction_value)
    }

    pub fn icon(&self) -> &'static str {
        self.base
            .with_zone(&self.zone_id, |z, s| Some(mapping::next_instruction_icon(z, s)))
            .unwrap_or("mdi:help")
    }

    pub fn attributes(&self) -> Option<NextInstructionAttributes> {
        self.base.with_zone(&self.zone_id, |z, _| {
            let slot = z.next_timeslot.as_ref()?;
            Some(NextInstructionAttributes {
                next_timeslot: slot
                    .begin_at
                    .map(|t| mapping::format_hhmm(t, self.time_zone)),
                next_instruction: slot.set_point.instruction.clone(),
            })
        })
    }
}
