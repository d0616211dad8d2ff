use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::ComapClient;
use crate::config::DEFAULT_UPDATE_INTERVAL;
use crate::diff::changed_paths;
use crate::mapping::derive_custom_temperatures;
use crate::store::{Listener, SnapshotStore};
use crate::types::*;
use crate::{Error, Result};

/// One vendor write. Every variant maps to exactly one client call.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    TemporaryInstruction {
        zone_id: String,
        instruction: Instruction,
        duration_minutes: Option<u32>,
    },
    RemoveTemporaryInstruction {
        zone_id: String,
    },
    CustomTemperature {
        slot: String,
        value: f64,
    },
    Schedule {
        schedule_id: String,
        zone_id: String,
    },
    Program {
        program_id: String,
    },
    HeatingSystem(bool),
    Holiday(bool),
    Absence(bool),
}

impl Write {
    pub fn action(&self) -> &'static str {
        match self {
            Write::TemporaryInstruction { .. } => "set_temporary_instruction",
            Write::RemoveTemporaryInstruction { .. } => "remove_temporary_instruction",
            Write::CustomTemperature { .. } => "set_custom_temperature",
            Write::Schedule { .. } => "set_schedule",
            Write::Program { .. } => "set_program",
            Write::HeatingSystem(true) => "turn_on",
            Write::HeatingSystem(false) => "turn_off",
            Write::Holiday(true) => "set_holiday",
            Write::Holiday(false) => "delete_holiday",
            Write::Absence(true) => "set_absence",
            Write::Absence(false) => "delete_absence",
        }
    }
}

pub struct CoordinatorBuilder {
    client: ComapClient,
    update_interval: Duration,
    listeners: Vec<Listener>,
}

impl CoordinatorBuilder {
    pub fn new(client: ComapClient) -> Self {
        Self {
            client,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            listeners: Vec::new(),
        }
    }

    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn on_update(mut self, f: impl Fn(&Snapshot) + Send + Sync + 'static) -> Self {
        self.listeners.push(Arc::new(f));
        self
    }

    /// Perform the mandatory first refresh. No coordinator exists without
    /// a snapshot, so a failure here aborts setup. A zero update interval is
    /// rejected before any request.
    pub async fn first_refresh(mut self) -> Result<Coordinator> {
        if self.update_interval.is_zero() {
            return Err(Error::Config("update interval must be positive".to_string()));
        }
        let snapshot = fetch_snapshot(&mut self.client).await?;
        let json = serde_json::to_value(&snapshot)?;
        self.client.log_snapshot(&json);
        info!(
            housing = %snapshot.housing.id,
            zones = snapshot.zones().len(),
            objects = snapshot.connected_objects.len(),
            "first refresh complete"
        );

        let store = SnapshotStore::new(snapshot, self.listeners);
        Ok(Coordinator {
            client: self.client,
            store: Arc::new(store),
            update_interval: self.update_interval,
            previous_json: json,
        })
    }
}

/// Owns the client and the published snapshot. Refreshes and writes take
/// `&mut self`, so at most one of them is in flight.
pub struct Coordinator {
    client: ComapClient,
    store: Arc<SnapshotStore>,
    update_interval: Duration,
    previous_json: Value,
}

impl Coordinator {
    pub fn builder(client: ComapClient) -> CoordinatorBuilder {
        CoordinatorBuilder::new(client)
    }

    pub fn store(&self) -> Arc<SnapshotStore> {
        self.store.clone()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.latest()
    }

    /// Period of the scheduled refresh; never zero.
    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn client(&self) -> &ComapClient {
        &self.client
    }

    /// Fetch and publish a new snapshot. On failure the previous snapshot
    /// stays published and the store is flagged as stale.
    pub async fn refresh(&mut self) -> Result<()> {
        let snapshot = match fetch_snapshot(&mut self.client).await {
            Ok(s) => s,
            Err(e) => {
                warn!("refresh failed: {e}");
                self.store.mark_failed();
                return Err(e);
            }
        };

        let json = serde_json::to_value(&snapshot)?;
        let changes = changed_paths(&self.previous_json, &json);
        debug!(changes = changes.len(), "snapshot refreshed");
        self.client.log_snapshot(&json);
        self.previous_json = json;

        self.store.publish(snapshot);
        Ok(())
    }

    /// Send one write, then force exactly one refresh. A failed write is
    /// returned as [`Error::CommandFailed`] and skips the refresh. A failed
    /// refresh after an accepted write only marks the snapshot stale.
    pub async fn dispatch(&mut self, write: Write) -> Result<()> {
        let action = write.action();
        debug!(action, "dispatching write");

        let result = match write {
            Write::TemporaryInstruction {
                zone_id,
                instruction,
                duration_minutes,
            } => {
                self.client
                    .set_temporary_instruction(&zone_id, &instruction, duration_minutes)
                    .await
            }
            Write::RemoveTemporaryInstruction { zone_id } => {
                self.client.remove_temporary_instruction(&zone_id).await
            }
            Write::CustomTemperature { slot, value } => {
                self.client.set_custom_temperature(&slot, value).await
            }
            Write::Schedule {
                schedule_id,
                zone_id,
            } => self.client.set_schedule(&schedule_id, &zone_id).await,
            Write::Program { program_id } => self.client.set_program(&program_id).await,
            Write::HeatingSystem(true) => self.client.turn_on().await,
            Write::HeatingSystem(false) => self.client.turn_off().await,
            Write::Holiday(true) => self.client.set_holiday().await,
            Write::Holiday(false) => self.client.delete_holiday().await,
            Write::Absence(true) => self.client.set_absence().await,
            Write::Absence(false) => self.client.delete_absence().await,
        };

        if let Err(e) = result {
            warn!(action, "write rejected: {e}");
            return Err(Error::CommandFailed {
                action,
                source: Box::new(e),
            });
        }

        if let Err(e) = self.refresh().await {
            warn!(action, "refresh after write failed: {e}");
        }
        Ok(())
    }
}

fn refresh_failed(read: &'static str) -> impl FnOnce(Error) -> Error {
    move |e| Error::RefreshFailed {
        read,
        source: Box::new(e),
    }
}

/// Run the seven vendor reads in order and assemble one snapshot. The
/// first failing read aborts the whole cycle.
async fn fetch_snapshot(client: &mut ComapClient) -> Result<Snapshot> {
    let temperatures = client
        .get_custom_temperatures()
        .await
        .map_err(refresh_failed("custom_temperatures"))?;
    let housing = client
        .get_housing_data()
        .await
        .map_err(refresh_failed("housing"))?;
    let connected_objects = client
        .get_housing_connected_objects()
        .await
        .map_err(refresh_failed("connected_objects"))?;
    let mut thermal = client
        .get_thermal_details()
        .await
        .map_err(refresh_failed("thermal_details"))?;
    let programs = client
        .get_programs()
        .await
        .map_err(refresh_failed("programs"))?;
    let active_program = client
        .get_active_program()
        .await
        .map_err(refresh_failed("active_program"))?;
    let schedules = client
        .get_schedules()
        .await
        .map_err(refresh_failed("schedules"))?;

    let state = thermal.heating_system_state;
    for zone in &mut thermal.zones {
        zone.heating_system_state = state;
    }

    Ok(Snapshot {
        housing,
        thermal,
        connected_objects,
        schedules,
        programs,
        active_program,
        custom_temperatures: derive_custom_temperatures(&temperatures),
        temperatures,
        fetched_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_actions_name_the_client_call() {
        assert_eq!(Write::HeatingSystem(true).action(), "turn_on");
        assert_eq!(Write::Holiday(false).action(), "delete_holiday");
        assert_eq!(Write::Absence(true).action(), "set_absence");
        let w = Write::Schedule {
            schedule_id: "s1".to_string(),
            zone_id: "z1".to_string(),
        };
        assert_eq!(w.action(), "set_schedule");
    }

    #[test]
    fn refresh_failed_keeps_read_name() {
        let err = refresh_failed("programs")(Error::Api {
            status: 500,
            message: "boom".to_string(),
        });
        match err {
            Error::RefreshFailed { read, source } => {
                assert_eq!(read, "programs");
                assert!(matches!(*source, Error::Api { status: 500, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
