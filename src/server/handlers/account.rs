//! Session handshake and account handlers.
//!
//! Authentication belongs to the agent CLI; these handlers only answer the
//! frontend's queries.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::server::router::{HandlerFuture, Reply};
use crate::server::state::AppState;
use crate::AppError;

/// Server name reported by `initialize`.
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

/// Server version reported by `initialize`.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `initialize`: identify the server.
pub fn initialize(_state: Arc<AppState>, params: Value) -> HandlerFuture {
    Box::pin(async move {
        let client = params
            .pointer("/clientInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(client, "client initialized");
        Ok(Reply::Result(json!({
            "userAgent": format!("{SERVER_NAME}/{SERVER_VERSION}"),
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
        })))
    })
}

/// `initialized`: acknowledged, nothing to do.
pub fn initialized(_state: Arc<AppState>, _params: Value) -> HandlerFuture {
    Box::pin(async move {
        debug!("client reported initialized");
        Ok(Reply::Result(json!({})))
    })
}

/// `account/read`: no account is managed here.
pub fn read(_state: Arc<AppState>, _params: Value) -> HandlerFuture {
    Box::pin(async move {
        Ok(Reply::Result(
            json!({ "account": null, "requiresOpenaiAuth": false }),
        ))
    })
}

/// `account/rateLimits/read`: limits are not tracked.
pub fn rate_limits(_state: Arc<AppState>, _params: Value) -> HandlerFuture {
    Box::pin(async move {
        Ok(Reply::Result(
            json!({ "rateLimits": { "primary": null, "secondary": null } }),
        ))
    })
}

/// `account/login/start`: always fails.
pub fn login_start(_state: Arc<AppState>, _params: Value) -> HandlerFuture {
    Box::pin(async move {
        Err(AppError::Unsupported(
            "interactive login is not supported; authenticate the claude CLI directly".into(),
        ))
    })
}

/// `account/login/cancel`: nothing to cancel.
pub fn login_cancel(_state: Arc<AppState>, _params: Value) -> HandlerFuture {
    Box::pin(async move { Ok(Reply::Result(json!({ "ok": true }))) })
}
