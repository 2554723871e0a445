//! Thread lifecycle over the protocol.

use serde_json::{json, Value};

use super::test_helpers::{start_thread, Harness, ScriptedAgent};

#[tokio::test]
async fn start_announces_and_returns_the_thread() {
    let mut h = Harness::start(ScriptedAgent::new());

    let response = h.request(1, "thread/start", json!({"cwd": "/work/project"})).await;
    let thread = &response["result"]["thread"];
    assert_eq!(thread["cwd"], "/work/project");
    assert_eq!(thread["name"], "New Thread");
    assert_eq!(thread["sessionId"], Value::Null);

    let started = h.recv().await;
    assert_eq!(started["method"], "thread/started");
    assert_eq!(started["params"]["thread"], *thread);
}

#[tokio::test]
async fn start_without_cwd_uses_a_default_directory() {
    let mut h = Harness::start(ScriptedAgent::new());

    let response = h.request(1, "thread/start", Value::Null).await;
    let cwd = response["result"]["thread"]["cwd"].as_str().expect("cwd");
    assert!(!cwd.is_empty());
}

#[tokio::test]
async fn list_returns_live_threads_newest_first() {
    let mut h = Harness::start(ScriptedAgent::new());
    let first = start_thread(&mut h, 1, "/a").await;
    let second = start_thread(&mut h, 2, "/b").await;
    h.state.threads.touch_at(&first, i64::MAX / 2);

    let response = h.request(3, "thread/list", json!({})).await;
    let ids: Vec<&str> = response["result"]["data"]
        .as_array()
        .expect("data")
        .iter()
        .filter_map(|t| t["id"].as_str())
        .collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    assert_eq!(response["result"]["nextCursor"], Value::Null);

    let limited = h.request(4, "thread/list", json!({"limit": 1})).await;
    assert_eq!(limited["result"]["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn archived_threads_leave_the_listing() {
    let mut h = Harness::start(ScriptedAgent::new());
    let keep = start_thread(&mut h, 1, "/a").await;
    let drop_me = start_thread(&mut h, 2, "/b").await;

    let archived = h.request(3, "thread/archive", json!({"threadId": drop_me})).await;
    assert_eq!(archived["result"]["ok"], true);

    let response = h.request(4, "thread/list", json!({})).await;
    let data = response["result"]["data"].as_array().expect("data");
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], keep.as_str());
}

#[tokio::test]
async fn archive_and_rename_of_unknown_thread_still_succeed() {
    let mut h = Harness::start(ScriptedAgent::new());

    let archived = h.request(1, "thread/archive", json!({"threadId": "thr_missing"})).await;
    assert_eq!(archived["result"]["ok"], true);
    let renamed = h
        .request(2, "thread/name/set", json!({"threadId": "thr_missing", "name": "x"}))
        .await;
    assert_eq!(renamed["result"]["ok"], true);
}

#[tokio::test]
async fn rename_changes_the_display_name() {
    let mut h = Harness::start(ScriptedAgent::new());
    let id = start_thread(&mut h, 1, "/a").await;

    h.request(2, "thread/name/set", json!({"threadId": id, "name": "Refactor"}))
        .await;
    assert_eq!(h.state.threads.get(&id).expect("thread").name, "Refactor");
}

#[tokio::test]
async fn fork_copies_directory_and_session() {
    let mut h = Harness::start(ScriptedAgent::new());
    let source = start_thread(&mut h, 1, "/repo").await;
    h.state.threads.set_session_id(&source, "sess-1");

    let response = h.request(2, "thread/fork", json!({"threadId": source})).await;
    let fork = &response["result"]["thread"];
    assert_ne!(fork["id"], source.as_str());
    assert_eq!(fork["cwd"], "/repo");
    assert_eq!(fork["sessionId"], "sess-1");

    let started = h.recv().await;
    assert_eq!(started["method"], "thread/started");
    assert_eq!(started["params"]["thread"]["id"], fork["id"]);
}

#[tokio::test]
async fn resume_returns_thread_with_empty_history() {
    let mut h = Harness::start(ScriptedAgent::new());
    let id = start_thread(&mut h, 1, "/repo").await;

    let response = h.request(2, "thread/resume", json!({"threadId": id})).await;
    assert_eq!(response["result"]["thread"]["id"], id.as_str());
    assert_eq!(response["result"]["thread"]["turns"], json!([]));
    assert_eq!(response["result"]["items"], json!([]));

    let resumed = h.recv().await;
    assert_eq!(resumed["method"], "thread/resumed");
}

#[tokio::test]
async fn resume_and_fork_of_unknown_thread_are_invalid_params() {
    let mut h = Harness::start(ScriptedAgent::new());

    for (id, method) in [(1, "thread/resume"), (2, "thread/fork")] {
        let response = h.request(id, method, json!({"threadId": "thr_nope"})).await;
        assert_eq!(response["error"]["code"], -32602, "{method}");
        assert_eq!(response["error"]["message"], "Thread not found", "{method}");
    }
}
