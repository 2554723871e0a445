//! Best-effort JSON store for threads.
//!
//! The whole registry is written as one JSON object keyed by thread id and
//! read back wholesale at startup. Every failure is logged and swallowed:
//! losing the store degrades to an empty thread list, never to a crash.
//!
//! Writes from inside a Tokio runtime run on the blocking pool. Snapshots are
//! numbered when taken and a write never replaces a newer one, so the file
//! always converges on the latest state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::models::thread::Thread;

/// File-backed thread store. A store without a path keeps nothing.
#[derive(Debug, Clone, Default)]
pub struct ThreadStore {
    path: Option<PathBuf>,
    order: Arc<WriteOrder>,
}

#[derive(Debug, Default)]
struct WriteOrder {
    taken: AtomicU64,
    written: Mutex<u64>,
}

/// Copy of the thread map waiting to be written.
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    threads: HashMap<String, Thread>,
}

impl ThreadStore {
    /// Store backed by `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            order: Arc::default(),
        }
    }

    /// Store that neither loads nor saves.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load every persisted thread.
    ///
    /// # Behaviour
    ///
    /// - **No path / missing file**: empty map.
    /// - **Unreadable or malformed file**: empty map and a warning.
    /// - Entries whose key disagrees with the embedded id are keyed by the id.
    #[must_use]
    pub fn load(&self) -> HashMap<String, Thread> {
        let Some(path) = &self.path else {
            return HashMap::new();
        };

        if !path.exists() {
            debug!(path = %path.display(), "thread store not found, starting empty");
            return HashMap::new();
        }

        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read thread store");
                return HashMap::new();
            }
        };

        if raw.trim().is_empty() {
            return HashMap::new();
        }

        match serde_json::from_str::<HashMap<String, Thread>>(&raw) {
            Ok(entries) => entries
                .into_values()
                .map(|thread| (thread.id.clone(), thread))
                .collect(),
            Err(err) => {
                warn!(path = %path.display(), %err, "malformed thread store, ignoring");
                HashMap::new()
            }
        }
    }

    /// Copy `threads` for a later [`write`](Self::write). Call while the map
    /// is still locked so snapshot order matches mutation order.
    ///
    /// Returns `None` for a disabled store.
    #[must_use]
    pub fn snapshot(&self, threads: &HashMap<String, Thread>) -> Option<Snapshot> {
        self.path.as_ref()?;
        Some(Snapshot {
            generation: self.order.taken.fetch_add(1, Ordering::SeqCst) + 1,
            threads: threads.clone(),
        })
    }

    /// Write a snapshot on the blocking pool, or inline when no runtime is
    /// running. A snapshot older than the last one written is dropped.
    pub fn write(&self, snapshot: Snapshot) {
        let store = self.clone();
        let write = move || store.write_ordered(&snapshot);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }

    fn write_ordered(&self, snapshot: &Snapshot) {
        let mut written = self
            .order
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *written > snapshot.generation {
            debug!(generation = snapshot.generation, "stale thread snapshot skipped");
            return;
        }
        self.save(&snapshot.threads);
        *written = snapshot.generation;
    }

    /// Write every thread, replacing the file contents. Blocks the caller.
    pub fn save(&self, threads: &HashMap<String, Thread>) {
        let Some(path) = &self.path else {
            return;
        };

        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), %err, "failed to create thread store directory");
                return;
            }
        }

        let raw = match serde_json::to_string_pretty(threads) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "failed to serialise thread store");
                return;
            }
        };

        if let Err(err) = fs::write(path, raw) {
            warn!(path = %path.display(), %err, "failed to write thread store");
        }
    }
}
