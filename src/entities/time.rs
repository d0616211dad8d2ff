use std::sync::{Arc, PoisonError, RwLock};

use chrono::{NaiveTime, Timelike};

use super::{DeviceInfo, EntityBase};
use crate::mapping;
use crate::store::SnapshotStore;
use crate::types::{Housing, Zone};
use crate::{Error, Result};

const DEFAULT_DURATION: (u32, u32) = (2, 0);
const MIN_DURATION: (u32, u32) = (0, 30);
const MAX_DURATION: (u32, u32) = (23, 59);

fn hm((h, m): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

/// Per-zone duration applied to temporary instructions set without an
/// explicit duration. Held locally; the vendor never sees it.
pub struct OverrideDuration {
    pub(crate) base: EntityBase,
    zone_id: String,
    value: RwLock<NaiveTime>,
}

impl OverrideDuration {
    pub(crate) fn new(store: Arc<SnapshotStore>, housing: &Housing, zone: &Zone) -> Self {
        Self {
            base: EntityBase {
                unique_id: format!("{}_timer", zone.id),
                name: mapping::build_name(Some(&zone.title), Some("Temporary instruction duration")),
                device: DeviceInfo::zone(housing, zone),
                store,
            },
            zone_id: zone.id.clone(),
            value: RwLock::new(hm(DEFAULT_DURATION)),
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn icon(&self) -> &'static str {
        "mdi:timer-outline"
    }

    pub fn min_value(&self) -> NaiveTime {
        hm(MIN_DURATION)
    }

    pub fn max_value(&self) -> NaiveTime {
        hm(MAX_DURATION)
    }

    pub fn value(&self) -> NaiveTime {
        *self.value.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn minutes(&self) -> u32 {
        let v = self.value();
        v.hour() * 60 + v.minute()
    }

    pub fn set_value(&self, value: NaiveTime) -> Result<()> {
        let value = value.with_second(0).and_then(|v| v.with_nanosecond(0)).unwrap_or(value);
        if value < self.min_value() || value > self.max_value() {
            return Err(Error::InvalidValue {
                what: "override duration",
                value: value.format("%H:%M").to_string(),
            });
        }
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
        Ok(())
    }

    /// Accepts `HH:MM` or `HH:MM:SS`.
    pub fn set_value_str(&self, value: &str) -> Result<()> {
        let parsed = NaiveTime::parse_from_str(value, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
            .map_err(|_| Error::InvalidValue {
                what: "override duration",
                value: value.to_string(),
            })?;
        self.set_value(parsed)
    }
}
