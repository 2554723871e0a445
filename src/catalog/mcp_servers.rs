//! Configured MCP server listing.
//!
//! Reads the `mcpServers` map from the agent's JSON configuration file. Every
//! failure (missing file, bad JSON, wrong shapes) degrades to an empty or
//! partial listing; nothing here returns an error.

use std::path::Path;

use serde_json::{json, Map, Value};
use tracing::debug;

/// Read and normalize the servers configured in `path`.
#[must_use]
pub fn read_mcp_servers(path: Option<&Path>) -> Vec<Value> {
    let Some(path) = path else {
        return Vec::new();
    };

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            debug!(path = %path.display(), %err, "mcp config not readable");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(root) => normalize_servers(&root),
        Err(err) => {
            debug!(path = %path.display(), %err, "mcp config is not valid json");
            Vec::new()
        }
    }
}

/// Normalize the `mcpServers` object of a configuration document, sorted by
/// server name. Entries that are not objects are skipped.
#[must_use]
pub fn normalize_servers(root: &Value) -> Vec<Value> {
    let Some(Value::Object(servers)) = root.get("mcpServers") else {
        return Vec::new();
    };

    let mut entries: Vec<(&String, &Map<String, Value>)> = servers
        .iter()
        .filter_map(|(name, entry)| entry.as_object().map(|entry| (name, entry)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    entries
        .into_iter()
        .map(|(name, entry)| normalize_entry(name, entry))
        .collect()
}

fn normalize_entry(name: &str, entry: &Map<String, Value>) -> Value {
    let command = entry.get("command").and_then(Value::as_str);
    let url = entry.get("url").and_then(Value::as_str);
    let transport = entry
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(match (command, url) {
            (Some(_), _) => "stdio",
            (None, Some(_)) => "http",
            (None, None) => "unknown",
        });
    let args: Vec<&str> = entry
        .get("args")
        .and_then(Value::as_array)
        .map(|args| args.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    json!({
        "name": name,
        "transport": transport,
        "command": command,
        "args": args,
        "url": url,
        "status": "configured",
        "tools": [],
        "resources": [],
    })
}
