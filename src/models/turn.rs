//! Turn lifecycle model.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TurnState {
    /// Registered and acknowledged, not yet announced.
    Created,
    /// `turn/started` emitted.
    Started,
    /// At least one agent event received.
    Streaming,
    /// Event stream exhausted normally.
    Completed,
    /// Cancelled by the peer or by shutdown.
    Interrupted,
    /// The agent query failed.
    Errored,
}

impl TurnState {
    /// Whether the state is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Interrupted | Self::Errored)
    }

    /// Determine whether a lifecycle transition is permitted.
    ///
    /// Interruption and failure may happen from any live state; completion
    /// only after streaming began or right after start (an agent may finish
    /// without events).
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Started)
                | (Self::Started, Self::Streaming | Self::Completed)
                | (
                    Self::Created | Self::Started | Self::Streaming,
                    Self::Interrupted | Self::Errored
                )
                | (Self::Streaming, Self::Completed)
        )
    }

    /// Wire status string used in `turn` objects.
    #[must_use]
    pub fn wire_status(self) -> &'static str {
        match self {
            Self::Created | Self::Started | Self::Streaming => "inProgress",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Errored => "failed",
        }
    }
}
