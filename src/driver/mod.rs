//! Agent query service abstraction.
//!
//! The [`AgentQueryService`] trait decouples turn orchestration from the
//! process that actually runs the agent. A query yields an [`AgentStream`]:
//! raw JSON events in source order plus an [`AgentControl`] handle for
//! answering the agent's permission and input requests.
//!
//! Events stay untyped on the stream; they are decoded exactly once, by
//! [`events::decode`], at the translator boundary.

pub mod claude_cli;
pub mod control;
pub mod events;

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::BoxStream;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::policy::PermissionMode;
use crate::{AppError, Result};

/// Parameters of one agent query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// User prompt.
    pub prompt: String,
    /// Working directory for the agent.
    pub cwd: String,
    /// Session to resume, when the thread already has one.
    pub resume_session_id: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Tool allowlist; `None` means unrestricted.
    pub allowed_tools: Option<Vec<String>>,
    /// Permission handling mode.
    pub permission_mode: PermissionMode,
}

/// Live event source for one query.
pub struct AgentStream {
    /// Raw events in the order the agent produced them. An `Err` item aborts
    /// the query; [`AppError::Cancelled`] marks an abort caused by the
    /// query's cancellation token.
    pub events: BoxStream<'static, Result<Value>>,
    /// Channel back into the running agent.
    pub control: AgentControl,
}

impl std::fmt::Debug for AgentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentStream")
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

/// Sends control messages (permission decisions, answers) to a running agent.
#[derive(Debug, Clone)]
pub struct AgentControl {
    tx: mpsc::Sender<Value>,
}

impl AgentControl {
    /// Control handle backed by `tx`.
    #[must_use]
    pub fn new(tx: mpsc::Sender<Value>) -> Self {
        Self { tx }
    }

    /// Deliver `msg` to the agent.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Agent`] when the agent has stopped reading.
    pub async fn send(&self, msg: Value) -> Result<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| AppError::Agent("control channel closed".into()))
    }
}

/// Runs agent queries.
pub trait AgentQueryService: Send + Sync {
    /// Start a query. `cancel` is signalled when the turn is interrupted;
    /// implementations should end the stream promptly afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Agent`] if the query cannot be started.
    fn query(
        &self,
        request: QueryRequest,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<AgentStream>> + Send + '_>>;
}
