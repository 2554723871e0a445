//! Turn execution.
//!
//! [`start_turn`] validates and registers a turn synchronously so the caller
//! can acknowledge it; the returned task then drives the agent query to a
//! terminal outcome:
//!
//! ```text
//! turn/started → item/started → (deltas, tool items, server requests)*
//!   ├── stream exhausted   → item/completed → turn/completed
//!   ├── token signalled    → turn/interrupted
//!   └── stream failed      → turn/error
//! ```
//!
//! The turn leaves the active set on every path, panics included, through
//! [`ActiveTurnGuard`]. Its cancellation token is signalled on exit so
//! reverse-channel waiters it spawned stop too.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::driver::control::{control_response, PermissionVerdict};
use crate::driver::{AgentControl, QueryRequest};
use crate::models::turn::TurnState;
use crate::orchestrator::translator::{Directive, ServerRequest, ServerRequestKind, TurnTranslator};
use crate::orchestrator::turn_manager::{ActiveTurnGuard, TurnHandle};
use crate::policy::{AccessMode, ApprovalPolicy};
use crate::server::state::AppState;
use crate::{AppError, Result};

/// A validated request to run one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    /// Target thread.
    pub thread_id: String,
    /// Prompt text; must not be blank.
    pub prompt: String,
    /// Working directory override; defaults to the thread's.
    pub cwd: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Tool access.
    pub access: AccessMode,
    /// Approval policy.
    pub approval: ApprovalPolicy,
}

/// A registered turn: the acknowledgement payload plus the task that runs it.
pub struct StartedTurn {
    /// Id of the new turn.
    pub turn_id: String,
    /// Turn object returned to the caller.
    pub turn: Value,
    /// Background task driving the turn.
    pub task: BoxFuture<'static, ()>,
}

impl std::fmt::Debug for StartedTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartedTurn")
            .field("turn_id", &self.turn_id)
            .field("turn", &self.turn)
            .finish_non_exhaustive()
    }
}

/// Concatenate the `text` items of a turn input, in order, joined by `\n`.
#[must_use]
pub fn extract_prompt(input: &[Value]) -> String {
    input
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wire form of a turn.
#[must_use]
pub fn turn_object(turn_id: &str, thread_id: &str, state: TurnState) -> Value {
    json!({
        "id": turn_id,
        "threadId": thread_id,
        "status": state.wire_status(),
        "items": [],
    })
}

/// Validate `request` and register the turn.
///
/// Nothing is registered when validation fails.
///
/// # Errors
///
/// - [`AppError::InvalidParams`] `"Thread not found"` for an unknown thread.
/// - [`AppError::InvalidParams`] `"Empty prompt"` for a blank prompt.
/// - [`AppError::InvalidParams`] `"Turn already in progress"` when the
///   thread is busy and concurrent turns are disabled.
pub fn start_turn(state: &Arc<AppState>, request: TurnRequest) -> Result<StartedTurn> {
    let thread = state
        .threads
        .get(&request.thread_id)
        .ok_or_else(|| AppError::InvalidParams("Thread not found".into()))?;

    if request.prompt.trim().is_empty() {
        return Err(AppError::InvalidParams("Empty prompt".into()));
    }

    let handle = state.turns.register(&thread.id)?;
    let query = QueryRequest {
        prompt: request.prompt,
        cwd: request.cwd.filter(|c| !c.trim().is_empty()).unwrap_or(thread.cwd),
        resume_session_id: thread.session_id,
        model: request.model,
        allowed_tools: request
            .access
            .allowed_tools()
            .map(|tools| tools.iter().map(|t| (*t).to_owned()).collect()),
        permission_mode: request.approval.permission_mode(),
    };

    info!(
        thread_id = %handle.thread_id,
        turn_id = %handle.turn_id,
        access = ?request.access,
        approval = ?request.approval,
        "turn accepted"
    );

    let turn = turn_object(&handle.turn_id, &handle.thread_id, TurnState::Started);
    let turn_id = handle.turn_id.clone();
    let task = run_turn(Arc::clone(state), handle, query).boxed();
    Ok(StartedTurn {
        turn_id,
        turn,
        task,
    })
}

enum Outcome {
    Completed,
    Interrupted,
    Failed(String),
}

/// Drive one registered turn to its terminal notification.
pub async fn run_turn(state: Arc<AppState>, handle: TurnHandle, query: QueryRequest) {
    let span = info_span!("turn", thread_id = %handle.thread_id, turn_id = %handle.turn_id);
    let _guard = ActiveTurnGuard::new(Arc::clone(&state.turns), handle.turn_id.clone());
    let _release = handle.cancel.clone().drop_guard();

    async move {
        let mut translator = TurnTranslator::new(&handle.thread_id, &handle.turn_id);
        state.turns.transition(&handle.turn_id, TurnState::Started);

        emit(
            &state,
            "turn/started",
            json!({
                "threadId": handle.thread_id,
                "turn": turn_object(&handle.turn_id, &handle.thread_id, TurnState::Started),
            }),
        )
        .await;
        emit(
            &state,
            "item/started",
            json!({
                "threadId": handle.thread_id,
                "turnId": handle.turn_id,
                "item": translator.message_item(),
            }),
        )
        .await;

        let outcome = stream_turn(&state, &handle, query, &mut translator).await;
        finish(&state, &handle, &translator, outcome).await;
    }
    .instrument(span)
    .await;
}

async fn stream_turn(
    state: &Arc<AppState>,
    handle: &TurnHandle,
    query: QueryRequest,
    translator: &mut TurnTranslator,
) -> Outcome {
    if handle.cancel.is_cancelled() {
        return Outcome::Interrupted;
    }

    let stream = match state.agent.query(query, handle.cancel.clone()).await {
        Ok(stream) => stream,
        Err(err) => return failure_outcome(handle, &err),
    };
    state.turns.transition(&handle.turn_id, TurnState::Streaming);

    let mut events = stream.events;
    let control = stream.control;

    loop {
        let item = tokio::select! {
            biased;

            () = handle.cancel.cancelled() => return Outcome::Interrupted,
            item = events.next() => item,
        };

        let raw = match item {
            None => return Outcome::Completed,
            Some(Ok(raw)) => raw,
            Some(Err(err)) => return failure_outcome(handle, &err),
        };

        for directive in translator.translate(&raw) {
            apply(state, handle, &control, directive).await;
        }
    }
}

fn failure_outcome(handle: &TurnHandle, err: &AppError) -> Outcome {
    if err.is_cancelled() || handle.cancel.is_cancelled() {
        Outcome::Interrupted
    } else {
        Outcome::Failed(err.to_string())
    }
}

async fn apply(
    state: &Arc<AppState>,
    handle: &TurnHandle,
    control: &AgentControl,
    directive: Directive,
) {
    match directive {
        Directive::Notify { method, params } => emit(state, method, params).await,
        Directive::CaptureSession(session_id) => {
            debug!(session_id = session_id.as_str(), "agent session captured");
            state.threads.set_session_id(&handle.thread_id, &session_id);
        }
        Directive::ServerRequest(request) => {
            relay_server_request(state, handle, control.clone(), request).await;
        }
    }
}

async fn finish(
    state: &Arc<AppState>,
    handle: &TurnHandle,
    translator: &TurnTranslator,
    outcome: Outcome,
) {
    match outcome {
        Outcome::Completed => {
            state.turns.transition(&handle.turn_id, TurnState::Completed);
            emit(
                state,
                "item/completed",
                json!({
                    "threadId": handle.thread_id,
                    "turnId": handle.turn_id,
                    "item": translator.message_item(),
                }),
            )
            .await;
            state.threads.touch(&handle.thread_id);
            emit(
                state,
                "turn/completed",
                json!({
                    "threadId": handle.thread_id,
                    "turn": turn_object(&handle.turn_id, &handle.thread_id, TurnState::Completed),
                }),
            )
            .await;
            info!("turn completed");
        }
        Outcome::Interrupted => {
            state.turns.transition(&handle.turn_id, TurnState::Interrupted);
            emit(
                state,
                "turn/interrupted",
                json!({ "threadId": handle.thread_id, "turnId": handle.turn_id }),
            )
            .await;
            info!("turn interrupted");
        }
        Outcome::Failed(message) => {
            state.turns.transition(&handle.turn_id, TurnState::Errored);
            warn!(error = message.as_str(), "turn failed");
            emit(
                state,
                "turn/error",
                json!({
                    "threadId": handle.thread_id,
                    "turnId": handle.turn_id,
                    "error": { "message": message },
                }),
            )
            .await;
        }
    }
}

// ── Reverse channel ──────────────────────────────────────────────────────────

/// Issue `request` to the peer and relay its answer to the agent from a
/// tracked background task. The task stops when the turn's token fires.
async fn relay_server_request(
    state: &Arc<AppState>,
    handle: &TurnHandle,
    control: AgentControl,
    request: ServerRequest,
) {
    let (request_id, reply_rx) = match state.outbound.request(request.method, request.params).await
    {
        Ok(issued) => issued,
        Err(err) => {
            warn!(%err, method = request.method, "failed to issue server request");
            return;
        }
    };

    let outbound = state.outbound.clone();
    let cancel = handle.cancel.clone();
    let ServerRequest {
        kind,
        control_request_id,
        input,
        ..
    } = request;

    state.tasks.spawn(async move {
        let reply = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(request_id = %request_id, "turn ended before the peer answered");
                outbound.abandon(&request_id);
                return;
            }
            reply = reply_rx => match reply {
                Ok(reply) => reply,
                Err(_) => {
                    debug!(request_id = %request_id, "server request dropped");
                    return;
                }
            },
        };

        let verdict = match kind {
            ServerRequestKind::Approval => PermissionVerdict::from_approval(&reply, &input),
            ServerRequestKind::UserInput => PermissionVerdict::from_user_input(&reply, &input),
        };
        debug!(
            request_id = %request_id,
            allowed = verdict.is_allow(),
            "relaying peer answer to agent"
        );
        if let Err(err) = control
            .send(control_response(&control_request_id, &verdict))
            .await
        {
            warn!(%err, "failed to relay peer answer to agent");
        }
    });
}

async fn emit(state: &AppState, method: &str, params: Value) {
    if let Err(err) = state.outbound.notify(method, params).await {
        warn!(%err, method, "failed to emit notification");
    }
}
