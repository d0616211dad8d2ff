use std::sync::Arc;

use super::{DeviceInfo, EntityBase};
use crate::coordinator::Coordinator;
use crate::mapping;
use crate::store::SnapshotStore;
use crate::types::Housing;
use crate::Result;

/// Forces a refresh of the snapshot when pressed.
pub struct RefreshButton {
    pub(crate) base: EntityBase,
}

impl RefreshButton {
    pub(crate) fn new(store: Arc<SnapshotStore>, housing: &Housing) -> Self {
        Self {
            base: EntityBase {
                unique_id: format!("{}_refresh", housing.id),
                name: mapping::build_name(None, Some("Refresh data button")),
                device: DeviceInfo::housing(housing),
                store,
            },
        }
    }

    pub async fn press(&self, coordinator: &mut Coordinator) -> Result<()> {
        coordinator.refresh().await
    }
}
