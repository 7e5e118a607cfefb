use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::tracker::{CloseReason, Tracker};

/// The named trackers of one entity.
pub struct TrackerRegistryEntry {
    uuid: Uuid,
    trackers: Mutex<FxHashMap<String, Arc<Mutex<Tracker>>>>,
}

impl TrackerRegistryEntry {
    /// The entity this entry belongs to.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Installs a tracker under its pipeline name. An existing tracker with
    /// the same name is closed with [`CloseReason::Replaced`] first.
    pub fn install(&self, tracker: Tracker) -> Arc<Mutex<Tracker>> {
        let name = tracker.name().to_string();
        let shared = Arc::new(Mutex::new(tracker));
        let replaced = self
            .trackers
            .lock()
            .insert(name, Arc::clone(&shared));
        if let Some(old) = replaced {
            old.lock().close_internal(CloseReason::Replaced);
        }
        shared
    }

    /// Returns the tracker with the given name, creating it on demand.
    pub fn get_or_create(
        &self,
        name: &str,
        create: impl FnOnce() -> Tracker,
    ) -> Arc<Mutex<Tracker>> {
        if let Some(existing) = self.trackers.lock().get(name) {
            return Arc::clone(existing);
        }
        // Built outside the lock; creation may be expensive.
        let tracker = create();
        debug_assert_eq!(tracker.name(), name);
        self.install(tracker)
    }

    /// A tracker by name.
    #[must_use]
    pub fn tracker(&self, name: &str) -> Option<Arc<Mutex<Tracker>>> {
        self.trackers.lock().get(name).map(Arc::clone)
    }

    /// Every tracker of this entity.
    #[must_use]
    pub fn trackers(&self) -> Vec<Arc<Mutex<Tracker>>> {
        self.trackers.lock().values().map(Arc::clone).collect()
    }

    /// Removes a tracker by name without closing it; the caller decides the
    /// close reason.
    pub(crate) fn take(&self, name: &str) -> Option<Arc<Mutex<Tracker>>> {
        self.trackers.lock().remove(name)
    }

    fn close_all(&self, reason: CloseReason) {
        let drained: Vec<_> = {
            let mut guard = self.trackers.lock();
            guard.drain().map(|(_, t)| t).collect()
        };
        for tracker in drained {
            tracker.lock().close_internal(reason);
        }
    }
}

/// Process-wide map from entity uuid to its tracker entry.
///
/// Reads (lookups) are concurrent from any thread; writes
/// (register/unregister) serialize on the outer lock. Entries hold no live
/// entity references, so tearing a tracker down can never leave a dangling
/// back-pointer here.
#[derive(Default)]
pub struct EntityTrackerRegistry {
    entries: RwLock<FxHashMap<Uuid, Arc<TrackerRegistryEntry>>>,
}

impl EntityTrackerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for an entity, if registered.
    #[must_use]
    pub fn entry(&self, uuid: Uuid) -> Option<Arc<TrackerRegistryEntry>> {
        self.entries.read().get(&uuid).map(Arc::clone)
    }

    /// The entry for an entity, registering one on demand.
    pub fn get_or_create(&self, uuid: Uuid) -> Arc<TrackerRegistryEntry> {
        if let Some(entry) = self.entry(uuid) {
            return entry;
        }
        let mut guard = self.entries.write();
        Arc::clone(guard.entry(uuid).or_insert_with(|| {
            Arc::new(TrackerRegistryEntry {
                uuid,
                trackers: Mutex::new(FxHashMap::default()),
            })
        }))
    }

    /// A specific tracker by entity and pipeline name.
    #[must_use]
    pub fn tracker(&self, uuid: Uuid, name: &str) -> Option<Arc<Mutex<Tracker>>> {
        self.entry(uuid).and_then(|e| e.tracker(name))
    }

    /// Removes a single tracker, closing it with
    /// [`CloseReason::Unregistered`].
    pub fn remove_tracker(&self, uuid: Uuid, name: &str) {
        if let Some(tracker) = self.entry(uuid).and_then(|e| e.take(name)) {
            tracker.lock().close_internal(CloseReason::Unregistered);
        }
    }

    /// Unregisters an entity, closing every tracker it owned.
    pub fn unregister(&self, uuid: Uuid) {
        let removed = self.entries.write().remove(&uuid);
        if let Some(entry) = removed {
            entry.close_all(CloseReason::Unregistered);
        }
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
