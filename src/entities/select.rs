use std::sync::Arc;

use super::{DeviceInfo, EntityBase};
use crate::coordinator::{Coordinator, Write};
use crate::mapping;
use crate::store::SnapshotStore;
use crate::types::{Housing, Zone};
use crate::{Error, Result};

pub const SELECT_ICON: &str = "mdi:form-select";

/// Schedule assigned to a zone by the active program.
pub struct ZoneScheduleSelect {
    pub(crate) base: EntityBase,
    zone_id: String,
}

impl ZoneScheduleSelect {
    pub(crate) fn new(store: Arc<SnapshotStore>, housing: &Housing, zone: &Zone) -> Self {
        Self {
            base: EntityBase {
                unique_id: format!("{}_schedule", zone.id),
                name: format!("Planning {} zone {}", housing.name, zone.title),
                device: DeviceInfo::zone(housing, zone),
                store,
            },
            zone_id: zone.id.clone(),
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn icon(&self) -> &'static str {
        SELECT_ICON
    }

    pub fn options(&self) -> Vec<String> {
        let snapshot = self.base.snapshot();
        mapping::schedule_options(&snapshot)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn current_option(&self) -> Option<String> {
        let snapshot = self.base.snapshot();
        mapping::active_schedule_title(&self.zone_id, &snapshot).map(str::to_string)
    }

    pub async fn select_option(&self, coordinator: &mut Coordinator, option: &str) -> Result<()> {
        let write = self.select_write(option)?;
        coordinator.dispatch(write).await
    }

    pub(crate) fn select_write(&self, option: &str) -> Result<Write> {
        let snapshot = self.base.snapshot();
        let schedule_id = mapping::schedule_id_by_title(option, &snapshot).ok_or_else(|| {
            Error::InvalidValue {
                what: "schedule",
                value: option.to_string(),
            }
        })?;
        Ok(Write::Schedule {
            schedule_id: schedule_id.to_string(),
            zone_id: self.zone_id.clone(),
        })
    }
}

/// Housing-wide program selection.
pub struct ProgramSelect {
    pub(crate) base: EntityBase,
}

impl ProgramSelect {
    pub(crate) fn new(store: Arc<SnapshotStore>, housing: &Housing) -> Self {
        Self {
            base: EntityBase {
                unique_id: format!("{}_program", housing.id),
                name: format!("Programme {}", housing.name),
                device: DeviceInfo::housing(housing),
                store,
            },
        }
    }

    pub fn icon(&self) -> &'static str {
        SELECT_ICON
    }

    pub fn options(&self) -> Vec<String> {
        let snapshot = self.base.snapshot();
        mapping::program_options(&snapshot)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn current_option(&self) -> Option<String> {
        let snapshot = self.base.snapshot();
        mapping::active_program_title(&snapshot).map(str::to_string)
    }

    pub async fn select_option(&self, coordinator: &mut Coordinator, option: &str) -> Result<()> {
        let write = self.select_write(option)?;
        coordinator.dispatch(write).await
    }

    pub(crate) fn select_write(&self, option: &str) -> Result<Write> {
        let snapshot = self.base.snapshot();
        let program_id =
            mapping::program_id_by_title(option, &snapshot).ok_or_else(|| Error::InvalidValue {
                what: "program",
                value: option.to_string(),
            })?;
        Ok(Write::Program {
            program_id: program_id.to_string(),
        })
    }
}
