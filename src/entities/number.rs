use std::sync::Arc;

use super::{DeviceInfo, EntityBase};
use crate::coordinator::{Coordinator, Write};
use crate::mapping;
use crate::store::SnapshotStore;
use crate::types::{CustomTemperature, Housing};
use crate::{Error, Result};

pub const MIN_TEMPERATURE: f64 = 5.0;
pub const MAX_TEMPERATURE: f64 = 25.0;
pub const TEMPERATURE_STEP: f64 = 0.5;
pub const UNIT_CELSIUS: &str = "°C";

/// Housing-wide custom temperature slot (night, away, presence_N, ...).
pub struct CustomTemperatureNumber {
    pub(crate) base: EntityBase,
    slot: String,
}

impl CustomTemperatureNumber {
    pub(crate) fn new(store: Arc<SnapshotStore>, housing: &Housing, temp: &CustomTemperature) -> Self {
        Self {
            base: EntityBase {
                unique_id: format!("{}_temp_{}", housing.id, temp.id),
                name: format!("{} {}", housing.name, temp.name),
                device: DeviceInfo::housing(housing),
                store,
            },
            slot: temp.id.clone(),
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn icon(&self) -> &'static str {
        "mdi:thermometer"
    }

    pub fn unit_of_measurement(&self) -> &'static str {
        UNIT_CELSIUS
    }

    pub fn value(&self) -> Option<f64> {
        let snapshot = self.base.snapshot();
        mapping::custom_temperature(&self.slot, &snapshot)?.value
    }

    pub async fn set_value(&self, coordinator: &mut Coordinator, value: f64) -> Result<()> {
        let write = self.value_write(value)?;
        coordinator.dispatch(write).await
    }

    pub(crate) fn value_write(&self, value: f64) -> Result<Write> {
        let on_step = ((value - MIN_TEMPERATURE) / TEMPERATURE_STEP).fract() == 0.0;
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&value) || !on_step {
            return Err(Error::InvalidValue {
                what: "custom temperature",
                value: value.to_string(),
            });
        }
        Ok(Write::CustomTemperature {
            slot: self.slot.clone(),
            value,
        })
    }
}
