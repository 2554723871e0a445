//! Listing handlers.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::catalog::mcp_servers::read_mcp_servers;
use crate::catalog::models::model_list as catalog_models;
use crate::server::router::{HandlerFuture, Reply};
use crate::server::state::AppState;

/// `model/list`.
pub fn model_list(state: Arc<AppState>, _params: Value) -> HandlerFuture {
    Box::pin(async move {
        let data = catalog_models(state.config.default_model.as_deref());
        Ok(Reply::Result(json!({ "data": data, "nextCursor": null })))
    })
}

/// `mcpServerStatus/list`.
pub fn mcp_server_status_list(state: Arc<AppState>, _params: Value) -> HandlerFuture {
    Box::pin(async move {
        let path = state.config.mcp_config_file();
        let data = tokio::task::spawn_blocking(move || read_mcp_servers(path.as_deref()))
            .await
            .unwrap_or_default();
        Ok(Reply::Result(json!({ "data": data, "nextCursor": null })))
    })
}

/// `skills/list`, `app/list`, `collaborationMode/list`: always empty.
pub fn empty_list(_state: Arc<AppState>, _params: Value) -> HandlerFuture {
    Box::pin(async move { Ok(Reply::Result(json!({ "data": [] }))) })
}
