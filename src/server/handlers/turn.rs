//! `turn/*` handlers.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::orchestrator::turn_runner::{extract_prompt, start_turn, TurnRequest};
use crate::policy::{AccessMode, ApprovalPolicy};
use crate::server::handlers::parse_params;
use crate::server::router::{HandlerFuture, Reply};
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartParams {
    thread_id: String,
    #[serde(default)]
    input: Vec<Value>,
    cwd: Option<String>,
    approval_policy: Option<String>,
    sandbox_policy: Option<Value>,
    access_mode: Option<String>,
    model: Option<String>,
    effort: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterruptParams {
    thread_id: Option<String>,
    turn_id: Option<String>,
}

/// `turn/start`: acknowledge the turn, then run it in the background.
pub fn start(state: Arc<AppState>, params: Value) -> HandlerFuture {
    Box::pin(async move {
        let params: StartParams = parse_params(params)?;
        if let Some(effort) = params.effort.as_deref() {
            debug!(effort, "reasoning effort is not configurable, ignored");
        }

        let access = match params.access_mode.as_deref() {
            Some(mode) => AccessMode::parse(Some(mode)),
            None => AccessMode::from_sandbox_policy(params.sandbox_policy.as_ref()),
        };
        let request = TurnRequest {
            prompt: extract_prompt(&params.input),
            thread_id: params.thread_id,
            cwd: params.cwd,
            model: params.model.filter(|m| !m.trim().is_empty()),
            access,
            approval: ApprovalPolicy::parse(params.approval_policy.as_deref()),
        };

        let started = start_turn(&state, request)?;
        Ok(Reply::ResultThen(json!({ "turn": started.turn }), started.task))
    })
}

/// `turn/interrupt`: cancel a turn if it is still running. Always succeeds.
pub fn interrupt(state: Arc<AppState>, params: Value) -> HandlerFuture {
    Box::pin(async move {
        let params: InterruptParams = parse_params(params)?;
        match params.turn_id.as_deref() {
            Some(turn_id) => {
                state.turns.interrupt(turn_id);
            }
            None => debug!(thread_id = ?params.thread_id, "turn/interrupt without turnId"),
        }
        Ok(Reply::Result(json!({ "ok": true })))
    })
}
