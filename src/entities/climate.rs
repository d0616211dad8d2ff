use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DeviceInfo, EntityBase};
use crate::coordinator::{Coordinator, Write};
use crate::mapping;
use crate::store::SnapshotStore;
use crate::types::*;
use crate::{Error, Result};

pub const TARGET_TEMPERATURE_STEP: f64 = 0.5;

/// Instruction sent for HVAC OFF / HEAT on temperature-driven zones.
const THERMOSTAT_OFF_TEMPERATURE: f64 = 7.0;
const THERMOSTAT_HEAT_TEMPERATURE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClimateFeature {
    TargetTemperature,
    PresetMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextTimeslot {
    pub next_timeslot: Option<DateTime<Utc>>,
    pub next_instruction: Option<Instruction>,
}

/// Zone thermostat. Its capabilities are fixed at construction from the
/// zone's set-point type and the compatibility profile.
pub struct Thermostat {
    pub(crate) base: EntityBase,
    zone_id: String,
    set_point_type: SetPointType,
    hvac_modes: Vec<HvacMode>,
    assist_compatibility: bool,
}

impl Thermostat {
    pub(crate) fn new(
        store: Arc<SnapshotStore>,
        housing: &Housing,
        zone: &Zone,
        assist_compatibility: bool,
    ) -> Self {
        let mut hvac_modes = vec![HvacMode::Off, HvacMode::Heat];
        if !assist_compatibility {
            hvac_modes.push(HvacMode::Auto);
        }
        Self {
            base: EntityBase {
                unique_id: zone.id.clone(),
                name: format!("Thermostat {} zone {}", housing.name, zone.title),
                device: DeviceInfo::zone(housing, zone),
                store,
            },
            zone_id: zone.id.clone(),
            set_point_type: zone.set_point_type,
            hvac_modes,
            assist_compatibility,
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn set_point_type(&self) -> SetPointType {
        self.set_point_type
    }

    pub fn supported_features(&self) -> Option<ClimateFeature> {
        match self.set_point_type {
            t if t.is_thermostat() => Some(ClimateFeature::TargetTemperature),
            SetPointType::PilotWire => Some(ClimateFeature::PresetMode),
            _ => None,
        }
    }

    pub fn hvac_modes(&self) -> &[HvacMode] {
        &self.hvac_modes
    }

    pub fn preset_modes(&self) -> &'static [Preset] {
        &Preset::ALL
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.base.with_zone(&self.zone_id, |z, _| z.temperature)
    }

    pub fn current_humidity(&self) -> Option<f64> {
        self.base.with_zone(&self.zone_id, |z, _| z.humidity)
    }

    pub fn target_temperature(&self) -> Option<f64> {
        if !self.set_point_type.is_thermostat() {
            return None;
        }
        self.base.with_zone(&self.zone_id, |z, s| {
            mapping::resolve_target_temperature(z, &s.temperatures)
        })
    }

    pub fn hvac_mode(&self) -> Option<HvacMode> {
        self.base.with_zone(&self.zone_id, |z, _| {
            mapping::hvac_mode(z, self.assist_compatibility)
        })
    }

    pub fn hvac_action(&self) -> Option<HvacAction> {
        self.base
            .with_zone(&self.zone_id, |z, _| Some(mapping::hvac_action(z)))
    }

    pub fn preset_mode(&self) -> Option<Preset> {
        if self.set_point_type != SetPointType::PilotWire {
            return None;
        }
        self.base.with_zone(&self.zone_id, |z, _| {
            z.instruction()
                .and_then(Instruction::as_token)
                .and_then(Preset::from_vendor_token)
        })
    }

    pub fn attributes(&self) -> Option<NextTimeslot> {
        self.base.with_zone(&self.zone_id, |z, _| {
            let slot = z.next_timeslot.as_ref();
            Some(NextTimeslot {
                next_timeslot: slot.and_then(|t| t.begin_at),
                next_instruction: slot.and_then(|t| t.set_point.instruction.clone()),
            })
        })
    }

    // -- Commands --

    pub async fn set_temperature(&self, coordinator: &mut Coordinator, temperature: f64) -> Result<()> {
        let write = self.temperature_write(temperature)?;
        coordinator.dispatch(write).await
    }

    pub async fn set_preset_mode(&self, coordinator: &mut Coordinator, preset: &str) -> Result<()> {
        let write = self.preset_write(preset)?;
        coordinator.dispatch(write).await
    }

    pub async fn set_hvac_mode(&self, coordinator: &mut Coordinator, mode: HvacMode) -> Result<()> {
        let write = self.hvac_mode_write(mode)?;
        coordinator.dispatch(write).await
    }

    pub(crate) fn temperature_write(&self, temperature: f64) -> Result<Write> {
        if !self.set_point_type.is_thermostat() {
            return Err(Error::InvalidValue {
                what: "target temperature for this zone",
                value: temperature.to_string(),
            });
        }
        Ok(self.override_write(Instruction::Temperature(temperature)))
    }

    pub(crate) fn preset_write(&self, preset: &str) -> Result<Write> {
        if self.set_point_type != SetPointType::PilotWire {
            return Err(Error::InvalidValue {
                what: "preset for this zone",
                value: preset.to_string(),
            });
        }
        let token = mapping::preset_to_vendor(preset)?;
        Ok(self.override_write(token.into()))
    }

    pub(crate) fn hvac_mode_write(&self, mode: HvacMode) -> Result<Write> {
        if !self.hvac_modes.contains(&mode) {
            return Err(Error::InvalidValue {
                what: "hvac mode",
                value: mode.as_str().to_string(),
            });
        }
        let instruction: Instruction = match (mode, self.set_point_type) {
            (HvacMode::Auto, _) => {
                return Ok(Write::RemoveTemporaryInstruction {
                    zone_id: self.zone_id.clone(),
                });
            }
            (HvacMode::Off, SetPointType::PilotWire) => Preset::Off.vendor_token().into(),
            (HvacMode::Heat, SetPointType::PilotWire) => Preset::Comfort.vendor_token().into(),
            (HvacMode::Off, t) if t.is_thermostat() => THERMOSTAT_OFF_TEMPERATURE.into(),
            (HvacMode::Heat, t) if t.is_thermostat() => THERMOSTAT_HEAT_TEMPERATURE.into(),
            _ => {
                return Err(Error::InvalidValue {
                    what: "hvac mode for this zone",
                    value: mode.as_str().to_string(),
                });
            }
        };
        Ok(self.override_write(instruction))
    }

    fn override_write(&self, instruction: Instruction) -> Write {
        Write::TemporaryInstruction {
            zone_id: self.zone_id.clone(),
            instruction,
            duration_minutes: None,
        }
    }
}
