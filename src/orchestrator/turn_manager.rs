//! Active-turn bookkeeping.
//!
//! A turn enters the active set when `turn/start` is accepted and leaves it
//! on its terminal transition, on `turn/interrupt`, or when its
//! [`ActiveTurnGuard`] drops, whichever comes first. Removal is idempotent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::turn::TurnState;
use crate::{AppError, Result};

/// Identity and cancellation handle of a registered turn.
#[derive(Debug, Clone)]
pub struct TurnHandle {
    /// Unique turn identifier.
    pub turn_id: String,
    /// Thread the turn runs against.
    pub thread_id: String,
    /// Token signalled by `turn/interrupt` or shutdown.
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct ActiveTurn {
    thread_id: String,
    cancel: CancellationToken,
    state: TurnState,
}

/// Tracks in-flight turns and enforces the turn state machine.
#[derive(Debug)]
pub struct TurnManager {
    active: Mutex<HashMap<String, ActiveTurn>>,
    allow_concurrent_turns: bool,
}

impl TurnManager {
    /// Create a manager. With `allow_concurrent_turns == false` a thread
    /// accepts only one active turn at a time.
    #[must_use]
    pub fn new(allow_concurrent_turns: bool) -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            allow_concurrent_turns,
        }
    }

    /// Register a new turn in the `Created` state.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidParams`] when the thread already has an
    /// active turn and concurrent turns are disabled.
    pub fn register(&self, thread_id: &str) -> Result<TurnHandle> {
        let mut active = self.lock();

        if !self.allow_concurrent_turns && active.values().any(|t| t.thread_id == thread_id) {
            return Err(AppError::InvalidParams("Turn already in progress".into()));
        }

        let turn_id = format!("turn_{}", Uuid::new_v4().simple());
        let cancel = CancellationToken::new();
        active.insert(
            turn_id.clone(),
            ActiveTurn {
                thread_id: thread_id.to_owned(),
                cancel: cancel.clone(),
                state: TurnState::Created,
            },
        );

        debug!(turn_id, thread_id, "turn registered");
        Ok(TurnHandle {
            turn_id,
            thread_id: thread_id.to_owned(),
            cancel,
        })
    }

    /// Move an active turn to `next`.
    ///
    /// Returns `false` if the turn is no longer active or the transition is
    /// not permitted. Terminal states remove the turn from the active set.
    pub fn transition(&self, turn_id: &str, next: TurnState) -> bool {
        let mut active = self.lock();
        let Some(turn) = active.get_mut(turn_id) else {
            return false;
        };

        if !turn.state.can_transition_to(next) {
            warn!(turn_id, from = ?turn.state, to = ?next, "illegal turn transition rejected");
            return false;
        }

        turn.state = next;
        if next.is_terminal() {
            active.remove(turn_id);
            debug!(turn_id, state = ?next, "turn finished");
        }
        true
    }

    /// Signal a turn's token and drop it from the active set.
    ///
    /// Returns whether the turn was active. Interrupting an unknown or
    /// finished turn is not an error.
    pub fn interrupt(&self, turn_id: &str) -> bool {
        let Some(turn) = self.lock().remove(turn_id) else {
            debug!(turn_id, "interrupt for inactive turn ignored");
            return false;
        };
        turn.cancel.cancel();
        info!(turn_id, thread_id = %turn.thread_id, "turn interrupted");
        true
    }

    /// Remove a turn without signalling it.
    pub fn forget(&self, turn_id: &str) -> bool {
        self.lock().remove(turn_id).is_some()
    }

    /// Signal and remove every active turn. Returns how many were active.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<ActiveTurn> = self.lock().drain().map(|(_, turn)| turn).collect();
        for turn in &drained {
            turn.cancel.cancel();
        }
        drained.len()
    }

    /// Number of active turns.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ActiveTurn>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a turn from the active set when dropped, covering early returns
/// and panics in the turn task.
#[derive(Debug)]
pub struct ActiveTurnGuard {
    turns: Arc<TurnManager>,
    turn_id: String,
}

impl ActiveTurnGuard {
    /// Guard `turn_id` in `turns`.
    #[must_use]
    pub fn new(turns: Arc<TurnManager>, turn_id: String) -> Self {
        Self { turns, turn_id }
    }
}

impl Drop for ActiveTurnGuard {
    fn drop(&mut self) {
        self.turns.forget(&self.turn_id);
    }
}
