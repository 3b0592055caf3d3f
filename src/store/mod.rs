//! # Shared store: thread-safe volatile and persistent state.
//!
//! [`SharedStore`] is the single point of truth for cross-worker communication
//! and for data that must outlive a restart. One instance is built at process
//! start and handed (as `Arc<SharedStore>`) to the supervisor and every worker.
//!
//! ## Namespaces
//! ```text
//! SharedStore ──► Mutex<PersistentState>   (sections, on disk)
//!             ├─► Mutex<VolatileState>     (RAM slots)
//!             └─► Arc<FrameQueue<Frame>>   (own lock, not replaceable)
//! ```
//!
//! ## Rules
//! - Each namespace has its own lock; every accessor call is atomic with
//!   respect to all other calls on the same namespace. No operation spans both.
//! - The persistent lock is held across the disk flush. Volatile slots and the
//!   frame queue never wait on it, so sensor and detector loops keep running
//!   while a counter is being written.
//! - Every `set_*` on a persistent section rewrites the whole document to disk
//!   (temp file, fsync, rename) before returning.
//! - A failed durable write is logged at `error` and swallowed; the in-memory
//!   value is kept. Losing a counter is better than crashing the supervisor.
//! - Accessors take closures over typed sections; there are no string keys.
//!
//! ## Example
//! ```no_run
//! use hostvisor::SharedStore;
//!
//! let store = SharedStore::open("config/system_state.json", 30);
//! let reboots = store.set_resilience(|r| {
//!     r.reboot_error_count += 1;
//!     r.reboot_error_count
//! });
//! assert_eq!(store.get_resilience(|r| r.reboot_error_count), reboots);
//! ```

mod persistent;
mod queue;
mod volatile;

pub use persistent::{
    Metadata, PersistenceSettings, PersistentState, Resilience, STATE_SCHEMA_VERSION,
    ScientificMetrics, SystemInfo,
};
pub use queue::{Frame, FrameQueue};
pub use volatile::VolatileState;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, error, info};

/// Thread-safe container for volatile and persistent data.
pub struct SharedStore {
    persistent: Mutex<PersistentState>,
    volatile: Mutex<VolatileState>,
    path: PathBuf,
    frames: Arc<FrameQueue<Frame>>,
}

impl SharedStore {
    /// Loads the persistent document from `path` and resets volatile slots.
    ///
    /// A missing or unreadable document is replaced by factory defaults, which
    /// are written back immediately so the next start reads them.
    pub fn open(path: impl AsRef<Path>, frame_capacity: usize) -> Self {
        let path = path.as_ref().to_path_buf();

        let (persistent, heal) = match persistent::read(&path) {
            Ok(state) => {
                info!(path = %path.display(), "loaded persistent state");
                (state, false)
            }
            Err(e) if e.is_not_found() => {
                info!(path = %path.display(), "no saved state found, using factory defaults");
                (PersistentState::default(), true)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, label = e.as_label(), "unusable state file, using factory defaults");
                (PersistentState::default(), true)
            }
        };

        let store = Self {
            persistent: Mutex::new(persistent),
            volatile: Mutex::new(VolatileState::default()),
            path,
            frames: Arc::new(FrameQueue::new(frame_capacity)),
        };

        if heal {
            let mut state = lock(&store.persistent);
            store.persist(&mut *state);
        }
        store
    }

    /// Location of the persistent document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ---- volatile ----

    /// Reads volatile slots.
    pub fn get_volatile<R>(&self, f: impl FnOnce(&VolatileState) -> R) -> R {
        f(&*lock(&self.volatile))
    }

    /// Updates volatile slots in place. Nothing is written to disk.
    pub fn set_volatile<R>(&self, f: impl FnOnce(&mut VolatileState) -> R) -> R {
        f(&mut *lock(&self.volatile))
    }

    /// Handle to the camera frame queue.
    ///
    /// Every caller gets the same queue; workers push/pop on it directly
    /// without touching the store lock.
    pub fn frame_queue(&self) -> Arc<FrameQueue<Frame>> {
        Arc::clone(&self.frames)
    }

    // ---- persistent ----

    pub fn get_resilience<R>(&self, f: impl FnOnce(&Resilience) -> R) -> R {
        f(&lock(&self.persistent).resilience)
    }

    /// Updates the `resilience` section and persists the document.
    pub fn set_resilience<R>(&self, f: impl FnOnce(&mut Resilience) -> R) -> R {
        self.update(|state| f(&mut state.resilience))
    }

    pub fn get_metric<R>(&self, f: impl FnOnce(&ScientificMetrics) -> R) -> R {
        f(&lock(&self.persistent).scientific_metrics)
    }

    /// Updates the `scientific_metrics` section and persists the document.
    pub fn set_metric<R>(&self, f: impl FnOnce(&mut ScientificMetrics) -> R) -> R {
        self.update(|state| f(&mut state.scientific_metrics))
    }

    pub fn get_settings<R>(&self, f: impl FnOnce(&PersistenceSettings) -> R) -> R {
        f(&lock(&self.persistent).persistence_settings)
    }

    /// Updates the `persistence_settings` section and persists the document.
    pub fn set_settings<R>(&self, f: impl FnOnce(&mut PersistenceSettings) -> R) -> R {
        self.update(|state| f(&mut state.persistence_settings))
    }

    /// Stamps this boot into `system_info` (and the install date on first boot).
    pub fn mark_boot(&self) {
        let now = Utc::now();
        self.update(|state| {
            let info = &mut state.system_info;
            info.first_install_date.get_or_insert(now);
            info.last_boot_timestamp = Some(now);
        });
    }

    /// Adds `hours` to the lifetime uptime counter.
    pub fn add_uptime_hours(&self, hours: f64) {
        self.update(|state| state.system_info.total_uptime_hours += hours);
    }

    /// Copy of the whole persistent document.
    pub fn snapshot(&self) -> PersistentState {
        lock(&self.persistent).clone()
    }

    /// Mutates the persistent document and writes it out under one lock hold.
    fn update<R>(&self, f: impl FnOnce(&mut PersistentState) -> R) -> R {
        let mut state = lock(&self.persistent);
        let out = f(&mut *state);
        self.persist(&mut *state);
        out
    }

    /// Called with the persistent lock held; blocks the caller for the flush.
    fn persist(&self, state: &mut PersistentState) {
        state.metadata.last_updated = Some(Utc::now());
        match persistent::write_durable(&self.path, state) {
            Ok(()) => debug!(path = %self.path.display(), "persistent state written"),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, label = e.as_label(), "CRITICAL: failed to persist state; continuing with in-memory values")
            }
        }
    }

}

/// Accessor closures cannot leave the state half-updated on panic, so poisoning is ignored.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl std::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStore")
            .field("path", &self.path)
            .field("frames", &self.frames.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fresh() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("system_state.json");
        (dir, path)
    }

    #[test]
    fn missing_file_heals_with_defaults() {
        let (_dir, path) = fresh();
        let store = SharedStore::open(&path, 4);
        assert!(path.exists());
        assert_eq!(store.get_resilience(|r| r.clone()), Resilience::default());

        let reloaded = SharedStore::open(&path, 4);
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert_eq!(reloaded.get_metric(|m| m.clone()), ScientificMetrics::default());
    }

    #[test]
    fn corrupted_file_heals_with_defaults() {
        let (_dir, path) = fresh();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{{{ not json").unwrap();

        let store = SharedStore::open(&path, 4);
        assert_eq!(store.get_resilience(|r| r.reboot_error_count), 0);

        let on_disk = persistent::read(&path).unwrap();
        assert_eq!(on_disk.resilience, Resilience::default());
        assert_eq!(on_disk.scientific_metrics, ScientificMetrics::default());
        assert_eq!(on_disk.metadata.version, STATE_SCHEMA_VERSION);
    }

    #[test]
    fn persistent_writes_survive_reload() {
        let (_dir, path) = fresh();
        let store = SharedStore::open(&path, 4);
        store.set_resilience(|r| {
            r.reboot_error_count = 7;
            r.maintenance_mode_active = true;
        });
        store.set_metric(|m| m.total_system_restarts += 2);
        store.set_settings(|s| s.eco_mode_active = true);

        assert_eq!(store.get_resilience(|r| r.reboot_error_count), 7);
        assert_eq!(store.get_metric(|m| m.total_system_restarts), 2);

        drop(store);
        let reloaded = SharedStore::open(&path, 4);
        assert_eq!(reloaded.get_resilience(|r| r.reboot_error_count), 7);
        assert!(reloaded.get_resilience(|r| r.maintenance_mode_active));
        assert_eq!(reloaded.get_metric(|m| m.total_system_restarts), 2);
        assert!(reloaded.get_settings(|s| s.eco_mode_active));
    }

    #[test]
    fn volatile_state_is_not_persisted() {
        let (_dir, path) = fresh();
        let store = SharedStore::open(&path, 4);
        store.set_volatile(|v| {
            v.voltage = 12.4;
            v.person_detected = true;
        });
        assert_eq!(store.get_volatile(|v| v.voltage), 12.4);

        let reloaded = SharedStore::open(&path, 4);
        assert_eq!(reloaded.get_volatile(|v| *v), VolatileState::default());
    }

    #[test]
    fn volatile_slots_do_not_wait_for_the_persistent_lock() {
        let (_dir, path) = fresh();
        let store = SharedStore::open(&path, 1);

        // Stands in for a writer that is in the middle of a disk flush.
        let _flushing = lock(&store.persistent);
        store.set_volatile(|v| v.cpu_temp = 51.5);
        assert_eq!(store.get_volatile(|v| v.cpu_temp), 51.5);
        store.frame_queue().push(Frame::synthetic(1));
    }

    #[test]
    fn frame_queue_handle_is_shared() {
        let (_dir, path) = fresh();
        let store = SharedStore::open(&path, 2);
        let producer = store.frame_queue();
        let consumer = store.frame_queue();

        producer.push(Frame::synthetic(1));
        assert_eq!(consumer.try_pop().map(|f| f.seq), Some(1));
        assert_eq!(consumer.capacity(), 2);
    }

    #[test]
    fn mark_boot_sets_install_date_once() {
        let (_dir, path) = fresh();
        let store = SharedStore::open(&path, 1);
        store.mark_boot();
        let first = store.snapshot().system_info.first_install_date;
        assert!(first.is_some());

        store.mark_boot();
        let info = store.snapshot().system_info;
        assert_eq!(info.first_install_date, first);
        assert!(info.last_boot_timestamp >= first);
    }

    #[test]
    fn write_failure_keeps_in_memory_value() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the state file should be makes every rename fail.
        let path = dir.path().join("state.json");
        fs::create_dir_all(path.join("occupied")).unwrap();

        let store = SharedStore::open(&path, 1);
        store.set_resilience(|r| r.reboot_error_count = 3);
        assert_eq!(store.get_resilience(|r| r.reboot_error_count), 3);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let (_dir, path) = fresh();
        let store = Arc::new(SharedStore::open(&path, 1));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        store.set_metric(|m| m.total_people_assisted += 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.get_metric(|m| m.total_people_assisted), 40);
        drop(store);
        let reloaded = SharedStore::open(&path, 1);
        assert_eq!(reloaded.get_metric(|m| m.total_people_assisted), 40);
    }
}
