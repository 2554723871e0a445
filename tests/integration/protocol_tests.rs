//! Wire-level behavior of the router and reader: error codes, notifications,
//! and the static handlers.

use std::time::Duration;

use serde_json::json;

use claude_app_server::rpc::codec::MAX_LINE_BYTES;

use super::test_helpers::{Harness, ScriptedAgent};

#[tokio::test]
async fn unknown_method_returns_method_not_found() {
    let mut h = Harness::start(ScriptedAgent::new());

    let response = h.request(1, "bogus/method", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Method not found: bogus/method");
    assert!(response.get("result").is_none());
}

#[tokio::test]
async fn notification_for_unknown_method_gets_no_reply() {
    let mut h = Harness::start(ScriptedAgent::new());

    h.send(json!({"method": "bogus/notification", "params": {}})).await;
    h.assert_silent(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn malformed_line_emits_parse_error_and_keeps_reading() {
    let mut h = Harness::start(ScriptedAgent::new());

    h.send_raw("{not json").await;
    let frame = h.recv().await;
    assert_eq!(frame["method"], "claude-code/parseError");
    assert_eq!(frame["params"]["raw"], "{not json");
    assert!(frame["params"]["error"].as_str().is_some_and(|e| !e.is_empty()));

    let response = h.request(2, "initialized", json!({})).await;
    assert_eq!(response["result"], json!({}));
}

#[tokio::test]
async fn oversized_line_is_reported_and_serving_continues() {
    let mut h = Harness::start(ScriptedAgent::new());

    h.send_raw(&"x".repeat(MAX_LINE_BYTES + 10)).await;
    let frame = h.recv().await;
    assert_eq!(frame["method"], "claude-code/parseError");
    assert!(frame["params"]["error"]
        .as_str()
        .is_some_and(|e| e.contains("line too long")));
    assert_eq!(frame["params"]["raw"], "");

    let response = h.request(2, "initialized", json!({})).await;
    assert_eq!(response["result"], json!({}));
}

#[tokio::test]
async fn ids_above_i64_range_get_exactly_one_response() {
    let mut h = Harness::start(ScriptedAgent::new());

    h.send_raw(r#"{"id":18446744073709551615,"method":"bogus/method"}"#).await;
    let response = h.recv().await;
    assert_eq!(response["id"], json!(u64::MAX));
    assert_eq!(response["error"]["code"], -32601);
    h.assert_silent(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn string_ids_are_echoed_verbatim() {
    let mut h = Harness::start(ScriptedAgent::new());

    h.send(json!({"id": "abc", "method": "account/read"})).await;
    let response = h.recv().await;
    assert_eq!(response["id"], "abc");
    assert_eq!(response["result"]["account"], serde_json::Value::Null);
    assert_eq!(response["result"]["requiresOpenaiAuth"], false);
}

#[tokio::test]
async fn initialize_reports_server_identity() {
    let mut h = Harness::start(ScriptedAgent::new());

    let response = h
        .request(1, "initialize", json!({"clientInfo": {"name": "test", "version": "0"}}))
        .await;
    let result = &response["result"];
    assert_eq!(result["serverInfo"]["name"], "claude-app-server");
    assert!(result["userAgent"]
        .as_str()
        .is_some_and(|ua| ua.starts_with("claude-app-server/")));
}

#[tokio::test]
async fn login_start_is_an_internal_error() {
    let mut h = Harness::start(ScriptedAgent::new());

    let response = h.request(1, "account/login/start", json!({})).await;
    assert_eq!(response["error"]["code"], -32603);
    assert!(response["error"]["message"]
        .as_str()
        .is_some_and(|m| m.starts_with("Internal error: ")));

    let cancel = h.request(2, "account/login/cancel", json!({})).await;
    assert_eq!(cancel["result"]["ok"], true);
}

#[tokio::test]
async fn rate_limits_are_empty() {
    let mut h = Harness::start(ScriptedAgent::new());

    let response = h.request(1, "account/rateLimits/read", json!({})).await;
    assert_eq!(
        response["result"],
        json!({"rateLimits": {"primary": null, "secondary": null}})
    );
}

#[tokio::test]
async fn empty_listings_return_empty_data() {
    let mut h = Harness::start(ScriptedAgent::new());

    for (id, method) in [(1, "skills/list"), (2, "app/list"), (3, "collaborationMode/list")] {
        let response = h.request(id, method, json!({})).await;
        assert_eq!(response["result"], json!({"data": []}), "{method}");
    }
}

#[tokio::test]
async fn model_list_marks_one_default() {
    let mut h = Harness::start(ScriptedAgent::new());

    let response = h.request(1, "model/list", json!({})).await;
    let data = response["result"]["data"].as_array().expect("data array");
    assert!(!data.is_empty());
    assert_eq!(data.iter().filter(|m| m["isDefault"] == true).count(), 1);
    assert_eq!(response["result"]["nextCursor"], serde_json::Value::Null);
}

#[tokio::test]
async fn mcp_server_status_list_returns_array() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("mcp.json");
    std::fs::write(
        &path,
        r#"{"mcpServers": {"files": {"command": "mcp-files", "args": ["--root", "/"]}}}"#,
    )
    .expect("write mcp config");
    let config = claude_app_server::config::GlobalConfig {
        mcp_config_path: Some(path),
        ..super::test_helpers::test_config()
    };
    let mut h = Harness::start_with(config, ScriptedAgent::new());

    let response = h.request(1, "mcpServerStatus/list", json!({})).await;
    let data = response["result"]["data"].as_array().expect("data array");
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["name"], "files");
    assert_eq!(data[0]["transport"], "stdio");
}

#[tokio::test]
async fn malformed_params_return_invalid_params() {
    let mut h = Harness::start(ScriptedAgent::new());

    let response = h.request(1, "thread/resume", json!({"threadId": 42})).await;
    assert_eq!(response["error"]["code"], -32602);
    assert!(response["error"]["message"]
        .as_str()
        .is_some_and(|m| m.starts_with("Invalid params")));
}

#[tokio::test]
async fn client_response_with_unknown_id_is_ignored() {
    let mut h = Harness::start(ScriptedAgent::new());

    h.send(json!({"id": 999, "result": {"decision": "accept"}})).await;
    h.assert_silent(Duration::from_millis(200)).await;
}
