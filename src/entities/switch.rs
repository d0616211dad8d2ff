use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{DeviceInfo, EntityBase};
use crate::coordinator::{Coordinator, Write};
use crate::mapping;
use crate::store::SnapshotStore;
use crate::types::*;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HousingSwitchKind {
    /// Global heating on/off.
    HeatingSystem,
    Holiday,
    Absence,
}

impl HousingSwitchKind {
    pub const ALL: [HousingSwitchKind; 3] = [
        HousingSwitchKind::HeatingSystem,
        HousingSwitchKind::Holiday,
        HousingSwitchKind::Absence,
    ];

    fn label(self) -> &'static str {
        match self {
            HousingSwitchKind::HeatingSystem => "Global switch",
            HousingSwitchKind::Holiday => "Holiday",
            HousingSwitchKind::Absence => "Absence",
        }
    }

    fn id_suffix(self) -> &'static str {
        match self {
            HousingSwitchKind::HeatingSystem => "on_off",
            HousingSwitchKind::Holiday => "holiday",
            HousingSwitchKind::Absence => "absence",
        }
    }

    fn write(self, on: bool) -> Write {
        match self {
            HousingSwitchKind::HeatingSystem => Write::HeatingSystem(on),
            HousingSwitchKind::Holiday => Write::Holiday(on),
            HousingSwitchKind::Absence => Write::Absence(on),
        }
    }
}

/// Housing-level switch: heating system, holiday or absence.
pub struct HousingSwitch {
    pub(crate) base: EntityBase,
    kind: HousingSwitchKind,
}

impl HousingSwitch {
    pub(crate) fn new(store: Arc<SnapshotStore>, housing: &Housing, kind: HousingSwitchKind) -> Self {
        Self {
            base: EntityBase {
                unique_id: format!("{}_{}", housing.id, kind.id_suffix()),
                name: mapping::build_name(None, Some(kind.label())),
                device: DeviceInfo::housing(housing),
                store,
            },
            kind,
        }
    }

    pub fn kind(&self) -> HousingSwitchKind {
        self.kind
    }

    pub fn is_on(&self) -> bool {
        let snapshot = self.base.snapshot();
        let thermal = &snapshot.thermal;
        match self.kind {
            HousingSwitchKind::HeatingSystem => {
                thermal.heating_system_state == Some(HeatingSystemState::On)
            }
            HousingSwitchKind::Holiday => thermal.events.absence.is_some(),
            HousingSwitchKind::Absence => thermal.events.time_shift.is_some(),
        }
    }

    /// Details of the running holiday or absence event.
    pub fn attributes(&self) -> Option<Value> {
        let snapshot = self.base.snapshot();
        let events = &snapshot.thermal.events;
        match self.kind {
            HousingSwitchKind::HeatingSystem => None,
            HousingSwitchKind::Holiday => events.absence.clone(),
            HousingSwitchKind::Absence => events.time_shift.clone(),
        }
    }

    pub async fn turn_on(&self, coordinator: &mut Coordinator) -> Result<()> {
        coordinator.dispatch(self.kind.write(true)).await
    }

    pub async fn turn_off(&self, coordinator: &mut Coordinator) -> Result<()> {
        coordinator.dispatch(self.kind.write(false)).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporaryAttributes {
    pub end_at: Option<DateTime<Utc>>,
    pub instruction: Option<Instruction>,
}

/// Shows whether a zone runs a temporary override. Only turning it off
/// has an effect.
pub struct TemporarySwitch {
    pub(crate) base: EntityBase,
    zone_id: String,
}

impl TemporarySwitch {
    pub(crate) fn new(store: Arc<SnapshotStore>, housing: &Housing, zone: &Zone) -> Self {
        Self {
            base: EntityBase {
                unique_id: format!("{}_temporary", zone.id),
                name: mapping::build_name(Some(&zone.title), Some("Temporary")),
                device: DeviceInfo::zone(housing, zone),
                store,
            },
            zone_id: zone.id.clone(),
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn is_on(&self) -> bool {
        self.base
            .with_zone(&self.zone_id, |z, _| Some(z.temporary_instruction().is_some()))
            .unwrap_or(false)
    }

    pub fn icon(&self) -> &'static str {
        if self.is_on() {
            "mdi:timer-minus"
        } else {
            "mdi:timer-off"
        }
    }

    pub fn attributes(&self) -> TemporaryAttributes {
        self.base
            .with_zone(&self.zone_id, |z, _| {
                let t = z.temporary_instruction()?;
                Some(TemporaryAttributes {
                    end_at: t.end_at,
                    instruction: t.set_point.instruction.clone(),
                })
            })
            .unwrap_or(TemporaryAttributes {
                end_at: None,
                instruction: None,
            })
    }

    pub async fn turn_on(&self, _coordinator: &mut Coordinator) -> Result<()> {
        Ok(())
    }

    pub async fn turn_off(&self, coordinator: &mut Coordinator) -> Result<()> {
        coordinator
            .dispatch(Write::RemoveTemporaryInstruction {
                zone_id: self.zone_id.clone(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::test_support;

    #[test]
    fn housing_switch_states() {
        let store = test_support::store();
        let snapshot = store.latest();
        let switch = |kind| HousingSwitch::new(store.clone(), &snapshot.housing, kind);

        let heating = switch(HousingSwitchKind::HeatingSystem);
        assert_eq!(heating.base.unique_id, "h1_on_off");
        assert_eq!(heating.base.name, "Global switch");
        assert!(heating.is_on());
        assert!(heating.attributes().is_none());

        let holiday = switch(HousingSwitchKind::Holiday);
        assert!(holiday.is_on());
        assert_eq!(
            holiday.attributes().unwrap()["end_at"],
            "2024-02-01T00:00:00Z"
        );

        let absence = switch(HousingSwitchKind::Absence);
        assert_eq!(absence.base.unique_id, "h1_absence");
        assert!(!absence.is_on());
    }

    #[test]
    fn housing_switch_writes() {
        assert_eq!(HousingSwitchKind::HeatingSystem.write(false), Write::HeatingSystem(false));
        assert_eq!(HousingSwitchKind::Holiday.write(true), Write::Holiday(true));
        assert_eq!(HousingSwitchKind::Absence.write(false), Write::Absence(false));
    }

    #[test]
    fn temporary_switch_reflects_override() {
        let store = test_support::store();
        let snapshot = store.latest();
        let z1 = mapping::zone_by_id("z1", &snapshot).unwrap();
        let z2 = mapping::zone_by_id("z2", &snapshot).unwrap();

        let off = TemporarySwitch::new(store.clone(), &snapshot.housing, z1);
        assert!(!off.is_on());
        assert_eq!(off.icon(), "mdi:timer-off");
        assert_eq!(off.attributes().instruction, None);

        let on = TemporarySwitch::new(store.clone(), &snapshot.housing, z2);
        assert_eq!(on.base.name, "Chambre Temporary");
        assert!(on.is_on());
        assert_eq!(on.icon(), "mdi:timer-minus");
        assert_eq!(on.attributes().instruction, Some(Instruction::from("comfort")));
        assert!(on.attributes().end_at.is_some());
    }
}
