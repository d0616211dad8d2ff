use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A zone set-point: either a plain temperature or a vendor token
/// (custom temperature key, pilot-wire mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instruction {
    Temperature(f64),
    Token(String),
}

impl Instruction {
    pub fn as_temperature(&self) -> Option<f64> {
        match self {
            Instruction::Temperature(t) => Some(*t),
            Instruction::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Instruction::Token(s) => Some(s),
            Instruction::Temperature(_) => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Temperature(t) => write!(f, "{t}"),
            Instruction::Token(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Instruction {
    fn from(t: f64) -> Self {
        Instruction::Temperature(t)
    }
}

impl From<&str> for Instruction {
    fn from(s: &str) -> Self {
        Instruction::Token(s.to_string())
    }
}

/// Capability profile of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetPointType {
    CustomTemperature,
    DefinedTemperature,
    PilotWire,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SetPointType {
    /// Zones driven by a temperature (as opposed to pilot-wire modes).
    pub fn is_thermostat(&self) -> bool {
        matches!(
            self,
            SetPointType::CustomTemperature | SetPointType::DefinedTemperature
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatingSystemState {
    On,
    Off,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HvacMode {
    Off,
    Heat,
    Auto,
}

impl HvacMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacMode::Off => "off",
            HvacMode::Heat => "heat",
            HvacMode::Auto => "auto",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "off" => Some(HvacMode::Off),
            "heat" => Some(HvacMode::Heat),
            "auto" => Some(HvacMode::Auto),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum HvacAction {
    #[default]
    Idle,
    Heating,
}

/// Display presets of a pilot-wire zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Preset {
    Off,
    Away,
    Eco,
    Comfort,
    ComfortMinus1,
    ComfortMinus2,
}

/// Vendor token of each preset, indexed by the preset's discriminant.
pub(crate) const PRESET_TABLE: [(&str, Preset); 6] = [
    ("stop", Preset::Off),
    ("frost_protection", Preset::Away),
    ("eco", Preset::Eco),
    ("comfort", Preset::Comfort),
    ("comfort_minus1", Preset::ComfortMinus1),
    ("comfort_minus2", Preset::ComfortMinus2),
];

impl Preset {
    pub const ALL: [Preset; 6] = [
        Preset::Off,
        Preset::Away,
        Preset::ComfortMinus1,
        Preset::ComfortMinus2,
        Preset::Eco,
        Preset::Comfort,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Preset::Off => "off",
            Preset::Away => "away",
            Preset::Eco => "eco",
            Preset::Comfort => "comfort",
            Preset::ComfortMinus1 => "comfort -1",
            Preset::ComfortMinus2 => "comfort -2",
        }
    }

    pub fn vendor_token(&self) -> &'static str {
        PRESET_TABLE[*self as usize].0
    }

    pub fn from_vendor_token(token: &str) -> Option<Self> {
        PRESET_TABLE
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, p)| *p)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Preset::ALL.into_iter().find(|p| p.label() == label)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetPoint {
    pub instruction: Option<Instruction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporaryInstruction {
    pub end_at: Option<DateTime<Utc>>,
    pub set_point: SetPoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneEvents {
    pub temporary_instruction: Option<TemporaryInstruction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeslot {
    pub begin_at: Option<DateTime<Utc>>,
    pub set_point: SetPoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Zone {
    pub id: String,
    pub title: String,
    pub set_point_type: SetPointType,
    pub set_point: SetPoint,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub heating_status: Option<String>,
    /// Copied from the housing-level thermal details on every refresh.
    pub heating_system_state: Option<HeatingSystemState>,
    pub events: ZoneEvents,
    pub last_presence_detected: Option<DateTime<Utc>>,
    pub next_timeslot: Option<Timeslot>,
    pub connected_objects: Vec<String>,
}

impl Zone {
    pub fn instruction(&self) -> Option<&Instruction> {
        self.set_point.instruction.as_ref()
    }

    pub fn temporary_instruction(&self) -> Option<&TemporaryInstruction> {
        self.events.temporary_instruction.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HousingEvents {
    /// Holiday period.
    pub absence: Option<Value>,
    /// Short absence.
    pub time_shift: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalDetails {
    pub heating_system_state: Option<HeatingSystemState>,
    pub services_available: Option<Value>,
    pub events: HousingEvents,
    pub zones: Vec<Zone>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Housing {
    pub id: String,
    pub name: String,
    pub address: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectedObject {
    pub serial_number: String,
    pub model: String,
    pub communication_status: Option<String>,
    pub voltage: Option<f64>,
    pub voltage_percent: Option<f64>,
    pub voltage_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramZone {
    pub id: String,
    pub schedule_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Program {
    pub id: String,
    pub title: String,
    pub is_activated: bool,
    pub zones: Vec<ProgramZone>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramList {
    pub programs: Vec<Program>,
}

/// Raw custom-temperature table: flat categories plus the `connected`
/// and `smart` sub-tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomTemperatures(pub Map<String, Value>);

impl CustomTemperatures {
    pub fn flat(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn sub_table(&self, table: &str, key: &str) -> Option<f64> {
        self.0
            .get(table)
            .and_then(|t| t.get(key))
            .and_then(Value::as_f64)
    }
}

/// A named custom temperature slot derived from [`CustomTemperatures`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomTemperature {
    pub id: String,
    pub name: String,
    pub value: Option<f64>,
    pub icon: &'static str,
}

/// One complete aggregation of a refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub housing: Housing,
    pub thermal: ThermalDetails,
    pub connected_objects: Vec<ConnectedObject>,
    pub schedules: Vec<Schedule>,
    pub programs: Vec<Program>,
    pub active_program: Program,
    pub temperatures: CustomTemperatures,
    pub custom_temperatures: Vec<CustomTemperature>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn zones(&self) -> &[Zone] {
        &self.thermal.zones
    }

    pub fn heating_system_state(&self) -> Option<HeatingSystemState> {
        self.thermal.heating_system_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preset_table_indexed_by_discriminant() {
        for (i, (_, preset)) in PRESET_TABLE.iter().enumerate() {
            assert_eq!(*preset as usize, i);
        }
    }

    #[test]
    fn instruction_deserializes_number_or_token() {
        let n: Instruction = serde_json::from_value(json!(19.5)).unwrap();
        assert_eq!(n, Instruction::Temperature(19.5));
        let t: Instruction = serde_json::from_value(json!("presence_1")).unwrap();
        assert_eq!(t.as_token(), Some("presence_1"));
    }

    #[test]
    fn zone_parses_sparse_payload() {
        let zone: Zone = serde_json::from_value(json!({
            "id": "z1",
            "title": "Salon",
            "set_point_type": "pilot_wire",
            "set_point": { "instruction": "eco" },
            "events": {},
            "connected_objects": ["SN1"]
        }))
        .unwrap();
        assert_eq!(zone.set_point_type, SetPointType::PilotWire);
        assert_eq!(zone.instruction().and_then(Instruction::as_token), Some("eco"));
        assert!(zone.temporary_instruction().is_none());
        assert!(zone.last_presence_detected.is_none());
    }

    #[test]
    fn unknown_set_point_type_is_tolerated() {
        let zone: Zone = serde_json::from_value(json!({
            "id": "z1",
            "set_point_type": "something_new"
        }))
        .unwrap();
        assert_eq!(zone.set_point_type, SetPointType::Unknown);
        assert!(!zone.set_point_type.is_thermostat());
    }

    #[test]
    fn connected_object_keeps_extra_fields() {
        let obj: ConnectedObject = serde_json::from_value(json!({
            "serial_number": "SN1",
            "model": "thermostat",
            "communication_status": "available",
            "firmware": "1.2.3"
        }))
        .unwrap();
        assert_eq!(obj.extra.get("firmware"), Some(&json!("1.2.3")));
        assert!(obj.voltage_percent.is_none());
    }
}
