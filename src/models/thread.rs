//! Thread model.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Name given to threads created without one.
pub const DEFAULT_THREAD_NAME: &str = "New Thread";

/// A resumable conversation with its own working directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Unique identifier, never reused.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Opaque agent session handle used to resume context; `None` until the
    /// first turn reports one.
    pub session_id: Option<String>,
    /// Working directory the agent runs in.
    pub cwd: String,
    /// Creation time, Unix seconds.
    pub created_at: i64,
    /// Last activity time, Unix seconds.
    pub updated_at: i64,
    /// Soft-delete flag; archived threads are hidden from listings.
    #[serde(default)]
    pub archived: bool,
}

impl Thread {
    /// Construct a fresh thread.
    #[must_use]
    pub fn new(id: String, cwd: String, now: i64) -> Self {
        Self {
            id,
            name: DEFAULT_THREAD_NAME.to_owned(),
            session_id: None,
            cwd,
            created_at: now,
            updated_at: now,
            archived: false,
        }
    }

    /// Record activity at `at`, keeping `updated_at >= created_at`.
    pub fn touch(&mut self, at: i64) {
        self.updated_at = at.max(self.created_at);
    }
}

/// Current time in Unix seconds.
#[must_use]
pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}
