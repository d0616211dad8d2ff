use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{DeviceInfo, EntityBase};
use crate::mapping;
use crate::store::SnapshotStore;
use crate::types::{Housing, Zone};

pub const DEVICE_CLASS_OCCUPANCY: &str = "occupancy";

/// Occupancy of a zone, derived from its last presence detection.
pub struct PresenceSensor {
    pub(crate) base: EntityBase,
    zone_id: String,
    timeout: Duration,
}

impl PresenceSensor {
    pub(crate) fn new(store: Arc<SnapshotStore>, housing: &Housing, zone: &Zone, timeout: Duration) -> Self {
        Self {
            base: EntityBase {
                unique_id: format!("{}_{}_presence", housing.id, zone.id),
                name: format!("{} presence", zone.title),
                device: DeviceInfo::zone(housing, zone),
                store,
            },
            zone_id: zone.id.clone(),
            timeout,
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn device_class(&self) -> &'static str {
        DEVICE_CLASS_OCCUPANCY
    }

    pub fn last_presence_detected(&self) -> Option<DateTime<Utc>> {
        self.base
            .with_zone(&self.zone_id, |z, _| z.last_presence_detected)
    }

    pub fn is_on(&self) -> Option<bool> {
        self.is_on_at(Utc::now())
    }

    pub(crate) fn is_on_at(&self, now: DateTime<Utc>) -> Option<bool> {
        let last = self.last_presence_detected()?;
        Some(mapping::is_present(now, last, self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::test_support;
    use chrono::TimeZone;

    fn sensor(zone_id: &str, timeout: Duration) -> PresenceSensor {
        let store = test_support::store();
        let snapshot = store.latest();
        let zone = mapping::zone_by_id(zone_id, &snapshot).unwrap();
        PresenceSensor::new(store.clone(), &snapshot.housing, zone, timeout)
    }

    #[test]
    fn presence_follows_timeout() {
        let s = sensor("z1", Duration::from_secs(3600));
        assert_eq!(s.base.unique_id, "h1_z1_presence");
        assert_eq!(s.base.name, "Salon presence");

        let at = |h, m| Utc.with_ymd_and_hms(2024, 1, 10, h, m, 0).unwrap();
        assert_eq!(s.is_on_at(at(8, 30)), Some(true));
        assert_eq!(s.is_on_at(at(9, 0)), Some(false));
    }

    #[test]
    fn short_timeout_profile() {
        let s = sensor("z1", Duration::from_secs(120));
        let at = Utc.with_ymd_and_hms(2024, 1, 10, 8, 1, 59).unwrap();
        assert_eq!(s.is_on_at(at), Some(true));
        let at = Utc.with_ymd_and_hms(2024, 1, 10, 8, 2, 0).unwrap();
        assert_eq!(s.is_on_at(at), Some(false));
    }

    #[test]
    fn unknown_without_timestamp() {
        let s = sensor("z2", Duration::from_secs(3600));
        assert_eq!(s.last_presence_detected(), None);
        assert_eq!(s.is_on(), None);
    }
}
