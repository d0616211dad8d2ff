use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::Snapshot;

pub(crate) type Listener = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Shared holder of the latest [`Snapshot`].
///
/// Publication swaps the whole `Arc`, so readers always see one complete
/// refresh. Listeners run synchronously on the publishing task.
pub struct SnapshotStore {
    latest: RwLock<Arc<Snapshot>>,
    listeners: RwLock<Vec<Listener>>,
    last_update_success: AtomicBool,
}

impl SnapshotStore {
    pub(crate) fn new(initial: Snapshot, listeners: Vec<Listener>) -> Self {
        Self {
            latest: RwLock::new(Arc::new(initial)),
            listeners: RwLock::new(listeners),
            last_update_success: AtomicBool::new(true),
        }
    }

    pub fn latest(&self) -> Arc<Snapshot> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscribe(&self, f: impl Fn(&Snapshot) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(f));
    }

    /// `false` while the most recent refresh attempt failed.
    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::Relaxed)
    }

    pub(crate) fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        self.last_update_success.store(true, Ordering::Relaxed);

        // run outside the lock so a listener may subscribe
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for cb in &listeners {
            cb(&snapshot);
        }
    }

    pub(crate) fn mark_failed(&self) {
        self.last_update_success.store(false, Ordering::Relaxed);
    }
}
