//! Unit tests for the model catalog and MCP server listing.

use serde_json::json;

use claude_app_server::catalog::mcp_servers::{normalize_servers, read_mcp_servers};
use claude_app_server::catalog::models::{model_list, DEFAULT_MODEL_ID, MODELS};

fn default_ids(models: &[serde_json::Value]) -> Vec<&str> {
    models
        .iter()
        .filter(|m| m["isDefault"] == true)
        .filter_map(|m| m["id"].as_str())
        .collect()
}

#[test]
fn catalog_lists_every_model_once() {
    let models = model_list(None);
    assert_eq!(models.len(), MODELS.len());
    let ids: Vec<&str> = models.iter().filter_map(|m| m["id"].as_str()).collect();
    assert_eq!(ids, vec!["default", "opus", "sonnet", "haiku"]);
    assert!(models[1]["displayName"].is_string());
}

#[test]
fn configured_default_is_marked() {
    assert_eq!(default_ids(&model_list(Some("sonnet"))), vec!["sonnet"]);
    assert_eq!(default_ids(&model_list(None)), vec![DEFAULT_MODEL_ID]);
    assert_eq!(default_ids(&model_list(Some("gpt-unknown"))), vec![DEFAULT_MODEL_ID]);
}

#[test]
fn servers_are_normalized_and_sorted() {
    let root = json!({
        "mcpServers": {
            "zeta": {"url": "https://example.test/mcp"},
            "alpha": {"command": "npx", "args": ["-y", "server", 3]},
            "beta": {"type": "sse", "url": "https://example.test/sse"},
            "broken": "not an object"
        }
    });

    let servers = normalize_servers(&root);
    let names: Vec<&str> = servers.iter().filter_map(|s| s["name"].as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta", "zeta"]);

    assert_eq!(
        servers[0],
        json!({
            "name": "alpha",
            "transport": "stdio",
            "command": "npx",
            "args": ["-y", "server"],
            "url": null,
            "status": "configured",
            "tools": [],
            "resources": []
        })
    );
    assert_eq!(servers[1]["transport"], "sse");
    assert_eq!(servers[2]["transport"], "http");
}

#[test]
fn missing_or_malformed_config_yields_empty_list() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(read_mcp_servers(None).is_empty());
    assert!(read_mcp_servers(Some(dir.path().join("absent.json").as_path())).is_empty());

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{oops").expect("write");
    assert!(read_mcp_servers(Some(bad.as_path())).is_empty());

    assert!(normalize_servers(&json!({"mcpServers": []})).is_empty());
    assert!(normalize_servers(&json!({})).is_empty());
}

#[test]
fn servers_are_read_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("claude.json");
    std::fs::write(
        &path,
        json!({"mcpServers": {"files": {"command": "mcp-files"}}}).to_string(),
    )
    .expect("write");

    let servers = read_mcp_servers(Some(path.as_path()));
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0]["command"], "mcp-files");
}
