//! In-memory thread registry.
//!
//! Owns every [`Thread`] for the life of the process. Operations that start
//! or resume work treat an unknown id as an error; administrative operations
//! (archive, rename) are best effort and report whether anything changed.
//! Each mutation is written through to the [`ThreadStore`] after the lock is
//! released.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::models::thread::{now_ts, Thread, DEFAULT_THREAD_NAME};
use crate::persistence::thread_store::ThreadStore;
use crate::{AppError, Result};

/// Listing size used when the caller gives no limit.
pub const DEFAULT_LIST_LIMIT: usize = 50;

const ID_PREFIX: &str = "thr_";

#[derive(Debug, Default)]
struct Inner {
    threads: HashMap<String, Thread>,
    next_seq: u64,
}

impl Inner {
    fn allocate_id(&mut self) -> String {
        self.next_seq += 1;
        format!("{ID_PREFIX}{}", self.next_seq)
    }
}

/// Process-wide thread store with lifecycle operations.
#[derive(Debug)]
pub struct ThreadRegistry {
    inner: Mutex<Inner>,
    store: ThreadStore,
}

impl ThreadRegistry {
    /// Build a registry seeded from `store`.
    ///
    /// The id counter starts past every persisted `thr_<n>` id so new ids
    /// never collide with loaded ones.
    #[must_use]
    pub fn new(store: ThreadStore) -> Self {
        let threads = store.load();
        let next_seq = threads
            .keys()
            .filter_map(|id| id.strip_prefix(ID_PREFIX))
            .filter_map(|seq| seq.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        if !threads.is_empty() {
            info!(count = threads.len(), "threads restored from store");
        }

        Self {
            inner: Mutex::new(Inner { threads, next_seq }),
            store,
        }
    }

    /// Registry without persistence.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(ThreadStore::disabled())
    }

    /// Create a thread rooted at `cwd`.
    pub fn create(&self, cwd: impl Into<String>) -> Thread {
        let mut inner = self.lock();
        let id = inner.allocate_id();
        let thread = Thread::new(id.clone(), cwd.into(), now_ts());
        inner.threads.insert(id, thread.clone());
        self.persist(inner);

        debug!(thread_id = %thread.id, cwd = %thread.cwd, "thread created");
        thread
    }

    /// Snapshot of a thread.
    #[must_use]
    pub fn get(&self, thread_id: &str) -> Option<Thread> {
        self.lock().threads.get(thread_id).cloned()
    }

    /// Look up a thread for resumption.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if `thread_id` is unknown.
    pub fn resume(&self, thread_id: &str) -> Result<Thread> {
        self.get(thread_id)
            .ok_or_else(|| AppError::NotFound("Thread not found".into()))
    }

    /// Create a new thread sharing the source's working directory and agent
    /// session. The source is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if `source_id` is unknown.
    pub fn fork(&self, source_id: &str) -> Result<Thread> {
        let mut inner = self.lock();
        let source = inner
            .threads
            .get(source_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Thread not found".into()))?;

        let id = inner.allocate_id();
        let mut thread = Thread::new(id.clone(), source.cwd, now_ts());
        thread.name = format!("{} (fork)", source.name);
        thread.session_id = source.session_id;
        inner.threads.insert(id, thread.clone());
        self.persist(inner);

        debug!(thread_id = %thread.id, source_id, "thread forked");
        Ok(thread)
    }

    /// Non-archived threads, most recently updated first, at most `limit`
    /// ([`DEFAULT_LIST_LIMIT`] when `None`).
    #[must_use]
    pub fn list(&self, limit: Option<usize>) -> Vec<Thread> {
        let inner = self.lock();
        let mut threads: Vec<Thread> = inner
            .threads
            .values()
            .filter(|thread| !thread.archived)
            .cloned()
            .collect();
        threads.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        threads.truncate(limit.unwrap_or(DEFAULT_LIST_LIMIT));
        threads
    }

    /// Soft-delete a thread. Returns `false` for unknown ids.
    pub fn archive(&self, thread_id: &str) -> bool {
        self.update(thread_id, |thread| thread.archived = true)
    }

    /// Rename a thread. A blank name resets it to the default. Returns
    /// `false` for unknown ids.
    pub fn rename(&self, thread_id: &str, name: &str) -> bool {
        let name = name.trim();
        let name = if name.is_empty() {
            DEFAULT_THREAD_NAME
        } else {
            name
        };
        self.update(thread_id, |thread| thread.name = name.to_owned())
    }

    /// Record the agent session handle reported by a turn.
    pub fn set_session_id(&self, thread_id: &str, session_id: &str) -> bool {
        self.update(thread_id, |thread| {
            thread.session_id = Some(session_id.to_owned());
        })
    }

    /// Bump `updated_at` to now.
    pub fn touch(&self, thread_id: &str) -> bool {
        self.touch_at(thread_id, now_ts())
    }

    /// Bump `updated_at` to `at` (clamped to `created_at`).
    pub fn touch_at(&self, thread_id: &str, at: i64) -> bool {
        self.update(thread_id, |thread| thread.touch(at))
    }

    /// Number of threads, archived included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().threads.len()
    }

    /// Whether the registry holds no threads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update(&self, thread_id: &str, apply: impl FnOnce(&mut Thread)) -> bool {
        let mut inner = self.lock();
        let Some(thread) = inner.threads.get_mut(thread_id) else {
            debug!(thread_id, "thread update ignored: unknown id");
            return false;
        };
        apply(thread);
        self.persist(inner);
        true
    }

    fn persist(&self, inner: MutexGuard<'_, Inner>) {
        let snapshot = self.store.snapshot(&inner.threads);
        drop(inner);
        if let Some(snapshot) = snapshot {
            self.store.write(snapshot);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
