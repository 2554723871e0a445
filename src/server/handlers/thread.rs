//! `thread/*` handlers.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::models::thread::Thread;
use crate::server::handlers::parse_params;
use crate::server::router::{HandlerFuture, Reply};
use crate::server::state::AppState;
use crate::{AppError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartParams {
    cwd: Option<String>,
    approval_policy: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadIdParams {
    thread_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    cursor: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetNameParams {
    thread_id: String,
    #[serde(default)]
    name: String,
}

/// Serialize a thread for the wire.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if serialization fails.
pub fn thread_value(thread: &Thread) -> Result<Value> {
    serde_json::to_value(thread)
        .map_err(|err| AppError::Internal(format!("failed to serialize thread: {err}")))
}

/// `thread/start`: create a thread and announce it.
pub fn start(state: Arc<AppState>, params: Value) -> HandlerFuture {
    Box::pin(async move {
        let params: StartParams = parse_params(params)?;
        let cwd = params
            .cwd
            .filter(|cwd| !cwd.trim().is_empty())
            .unwrap_or_else(default_cwd);
        if let Some(policy) = params.approval_policy.as_deref() {
            debug!(policy, "thread approval policy noted; applied per turn");
        }

        let thread = thread_value(&state.threads.create(cwd))?;
        state
            .outbound
            .notify("thread/started", json!({ "thread": thread }))
            .await?;
        Ok(Reply::Result(json!({ "thread": thread })))
    })
}

/// `thread/resume`: return a known thread. Item history is not kept, so
/// `items` is always empty.
pub fn resume(state: Arc<AppState>, params: Value) -> HandlerFuture {
    Box::pin(async move {
        let params: ThreadIdParams = parse_params(params)?;
        let mut thread = thread_value(&state.threads.resume(&params.thread_id)?)?;
        thread["turns"] = json!([]);

        state
            .outbound
            .notify("thread/resumed", json!({ "thread": thread }))
            .await?;
        Ok(Reply::Result(json!({ "thread": thread, "items": [] })))
    })
}

/// `thread/fork`: copy a thread's directory and session into a new thread.
pub fn fork(state: Arc<AppState>, params: Value) -> HandlerFuture {
    Box::pin(async move {
        let params: ThreadIdParams = parse_params(params)?;
        let thread = thread_value(&state.threads.fork(&params.thread_id)?)?;

        state
            .outbound
            .notify("thread/started", json!({ "thread": thread }))
            .await?;
        Ok(Reply::Result(json!({ "thread": thread })))
    })
}

/// `thread/list`: most recently updated non-archived threads. Listings are
/// not paginated; `nextCursor` is always null.
pub fn list(state: Arc<AppState>, params: Value) -> HandlerFuture {
    Box::pin(async move {
        let params: ListParams = parse_params(params)?;
        if params.cursor.is_some() {
            debug!("thread/list cursor ignored");
        }

        let data = state
            .threads
            .list(params.limit)
            .iter()
            .map(thread_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(Reply::Result(json!({ "data": data, "nextCursor": null })))
    })
}

/// `thread/archive`: hide a thread from listings.
pub fn archive(state: Arc<AppState>, params: Value) -> HandlerFuture {
    Box::pin(async move {
        let params: ThreadIdParams = parse_params(params)?;
        state.threads.archive(&params.thread_id);
        Ok(Reply::Result(json!({ "ok": true })))
    })
}

/// `thread/name/set`: rename a thread.
pub fn set_name(state: Arc<AppState>, params: Value) -> HandlerFuture {
    Box::pin(async move {
        let params: SetNameParams = parse_params(params)?;
        state.threads.rename(&params.thread_id, &params.name);
        Ok(Reply::Result(json!({ "ok": true })))
    })
}

fn default_cwd() -> String {
    std::env::current_dir()
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_else(|_| ".".to_owned())
}
