//! Request router.
//!
//! Maps a method name to its handler with a static `match` and owns the
//! error-code policy:
//!
//! | Situation                        | Request (has id)               | Notification |
//! |----------------------------------|--------------------------------|--------------|
//! | unknown method                   | `-32601` `Method not found: m` | dropped      |
//! | handler returns invalid params   | `-32602` with its message      | logged       |
//! | handler fails or panics          | `-32603` `Internal error: ...` | logged       |
//! | handler succeeds                 | `result`                       | nothing      |
//!
//! Handlers run on their own task so a panic is contained and reported like
//! any other handler failure.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info_span, warn, Instrument};

use crate::rpc::message::{RequestId, RpcError};
use crate::server::handlers::{account, catalog, review, thread, turn};
use crate::server::state::AppState;
use crate::Result;

/// What a handler wants sent back.
pub enum Reply {
    /// Success response.
    Result(Value),
    /// Error response with an explicit code.
    Error(RpcError),
    /// Success response, then start background work.
    ResultThen(Value, BoxFuture<'static, ()>),
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Result(value) => f.debug_tuple("Result").field(value).finish(),
            Self::Error(error) => f.debug_tuple("Error").field(error).finish(),
            Self::ResultThen(value, _) => f.debug_tuple("ResultThen").field(value).finish(),
        }
    }
}

/// Future returned by every handler.
pub type HandlerFuture = BoxFuture<'static, Result<Reply>>;

/// Handler signature.
pub type Handler = fn(Arc<AppState>, Value) -> HandlerFuture;

/// Look up the handler for `method`.
#[must_use]
pub fn route(method: &str) -> Option<Handler> {
    let handler: Handler = match method {
        "initialize" => account::initialize,
        "initialized" => account::initialized,
        "thread/start" => thread::start,
        "thread/resume" => thread::resume,
        "thread/fork" => thread::fork,
        "thread/list" => thread::list,
        "thread/archive" => thread::archive,
        "thread/name/set" => thread::set_name,
        "turn/start" => turn::start,
        "turn/interrupt" => turn::interrupt,
        "review/start" => review::start,
        "model/list" => catalog::model_list,
        "mcpServerStatus/list" => catalog::mcp_server_status_list,
        "skills/list" | "app/list" | "collaborationMode/list" => catalog::empty_list,
        "account/read" => account::read,
        "account/rateLimits/read" => account::rate_limits,
        "account/login/start" => account::login_start,
        "account/login/cancel" => account::login_cancel,
        _ => return None,
    };
    Some(handler)
}

/// Dispatch one request (`id` present) or notification (`id` absent).
pub async fn dispatch(state: &Arc<AppState>, id: Option<RequestId>, method: &str, params: Value) {
    let span = info_span!(
        "request",
        method,
        request_id = id.as_ref().map(ToString::to_string)
    );

    async {
        let Some(handler) = route(method) else {
            match &id {
                Some(id) => {
                    debug!("unknown method");
                    send_error(state, id, &RpcError::method_not_found(method)).await;
                }
                None => debug!("notification for unknown method dropped"),
            }
            return;
        };

        let reply = match tokio::spawn(handler(Arc::clone(state), params)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                warn!(%err, "handler failed");
                Reply::Error(RpcError::from(&err))
            }
            Err(join_err) => {
                warn!(error = %join_err, "handler panicked");
                Reply::Error(RpcError::internal("handler panicked"))
            }
        };

        match reply {
            Reply::Result(result) => send_result(state, id.as_ref(), result).await,
            Reply::Error(error) => match &id {
                Some(id) => send_error(state, id, &error).await,
                None => debug!(code = error.code, message = error.message.as_str(), "notification failed"),
            },
            Reply::ResultThen(result, task) => {
                send_result(state, id.as_ref(), result).await;
                state.tasks.spawn(task);
            }
        }
    }
    .instrument(span)
    .await;
}

async fn send_result(state: &AppState, id: Option<&RequestId>, result: Value) {
    let Some(id) = id else { return };
    if let Err(err) = state.outbound.respond(id, result).await {
        warn!(%err, "failed to send response");
    }
}

async fn send_error(state: &AppState, id: &RequestId, error: &RpcError) {
    if let Err(err) = state.outbound.respond_error(id, error).await {
        warn!(%err, "failed to send error response");
    }
}
