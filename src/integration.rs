use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::ComapClient;
use crate::config::{Config, Options};
use crate::coordinator::{Coordinator, Write};
use crate::entities::{self, Entity};
use crate::mapping;
use crate::store::SnapshotStore;
use crate::types::{Instruction, Snapshot};
use crate::{Error, Result};

/// A running Comap housing: coordinator, published snapshot and entities.
///
/// Refreshes and writes go through one async mutex, so scheduled polls and
/// commands never overlap.
pub struct Integration {
    coordinator: Arc<Mutex<Coordinator>>,
    store: Arc<SnapshotStore>,
    entities: Vec<Entity>,
    options: Options,
    update_interval: Duration,
}

impl Integration {
    pub async fn setup(config: Config, options: Options) -> Result<Self> {
        let client = ComapClient::builder(config).build()?;
        Self::with_client(client, options).await
    }

    /// Set up from a preconfigured client (exchange log, timeouts).
    pub async fn with_client(client: ComapClient, options: Options) -> Result<Self> {
        let coordinator = Coordinator::builder(client)
            .update_interval(options.update_interval)
            .first_refresh()
            .await?;
        let store = coordinator.store();
        let update_interval = coordinator.update_interval();
        let entities = entities::build_entities(&store, &options);
        info!(entities = entities.len(), "integration ready");

        Ok(Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
            store,
            entities,
            options,
            update_interval,
        })
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, unique_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.unique_id() == unique_id)
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.latest()
    }

    pub fn subscribe(&self, f: impl Fn(&Snapshot) + Send + Sync + 'static) {
        self.store.subscribe(f);
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn last_update_success(&self) -> bool {
        self.store.last_update_success()
    }

    /// Exclusive access to the coordinator, for entity commands.
    pub async fn lock(&self) -> MutexGuard<'_, Coordinator> {
        self.coordinator.lock().await
    }

    pub async fn refresh(&self) -> Result<()> {
        self.coordinator.lock().await.refresh().await
    }

    pub async fn dispatch(&self, write: Write) -> Result<()> {
        self.coordinator.lock().await.dispatch(write).await
    }

    /// Refresh on the configured period until the task is aborted. The
    /// first tick is skipped since setup already refreshed.
    pub fn spawn_polling(&self) -> JoinHandle<()> {
        let coordinator = self.coordinator.clone();
        let period = self.update_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                debug!("scheduled refresh");
                if let Err(e) = coordinator.lock().await.refresh().await {
                    warn!("scheduled refresh failed: {e}");
                }
            }
        })
    }

    /// Host-level service: override the zone behind `entity_id`. Without a
    /// duration, the zone's override-duration input applies.
    pub async fn set_temporary_instruction(
        &self,
        entity_id: &str,
        instruction: Instruction,
        duration_minutes: Option<u32>,
    ) -> Result<()> {
        let write = self.temporary_instruction_write(entity_id, instruction, duration_minutes)?;
        self.dispatch(write).await
    }

    pub(crate) fn temporary_instruction_write(
        &self,
        entity_id: &str,
        instruction: Instruction,
        duration_minutes: Option<u32>,
    ) -> Result<Write> {
        let entity = self
            .entity(entity_id)
            .ok_or_else(|| Error::UnknownEntity(entity_id.to_string()))?;
        let zone_id = entity
            .zone_id()
            .ok_or_else(|| Error::UnknownZone(entity_id.to_string()))?;
        if mapping::zone_by_id(zone_id, &self.snapshot()).is_none() {
            return Err(Error::UnknownZone(zone_id.to_string()));
        }

        let duration_minutes = duration_minutes.or_else(|| {
            self.entities.iter().find_map(|e| match e {
                Entity::OverrideDuration(d) if d.zone_id() == zone_id => Some(d.minutes()),
                _ => None,
            })
        });

        Ok(Write::TemporaryInstruction {
            zone_id: zone_id.to_string(),
            instruction,
            duration_minutes,
        })
    }
}
