//! `review/start` runs a read-only turn, inline or on a fork.

use serde_json::json;

use super::test_helpers::{methods, start_thread, Harness, ScriptedAgent};

#[tokio::test]
async fn inline_review_runs_on_the_same_thread() {
    let agent = ScriptedAgent::new();
    let mut h = Harness::start(agent.clone());
    let thread_id = start_thread(&mut h, 1, "/repo").await;

    let response = h
        .request(
            2,
            "review/start",
            json!({"threadId": thread_id, "target": {"type": "uncommittedChanges"}}),
        )
        .await;
    assert_eq!(response["result"]["reviewThreadId"], thread_id.as_str());
    assert_eq!(response["result"]["turn"]["threadId"], thread_id.as_str());

    h.recv_until("turn/completed").await;

    let request = &agent.requests()[0];
    assert!(request.prompt.contains("uncommitted changes"));
    let tools = request.allowed_tools.as_ref().expect("read-only tools");
    assert!(!tools.iter().any(|t| t == "Write" || t == "Edit" || t == "Bash"));
}

#[tokio::test]
async fn detached_review_runs_on_a_fork() {
    let agent = ScriptedAgent::new();
    let mut h = Harness::start(agent.clone());
    let thread_id = start_thread(&mut h, 1, "/repo").await;

    let response = h
        .request(
            2,
            "review/start",
            json!({
                "threadId": thread_id,
                "target": {"type": "commit", "sha": "abc123", "title": "Fix parser"},
                "delivery": "detached",
            }),
        )
        .await;
    let review_thread = response["result"]["reviewThreadId"]
        .as_str()
        .expect("review thread")
        .to_owned();
    assert_ne!(review_thread, thread_id);
    assert_eq!(response["result"]["turn"]["threadId"], review_thread.as_str());

    let frames = h.recv_until("turn/completed").await;
    let names = methods(&frames);
    assert_eq!(names[0], "thread/started");
    assert_eq!(frames[0]["params"]["thread"]["id"], review_thread.as_str());
    assert_eq!(frames[0]["params"]["thread"]["cwd"], "/repo");

    let prompt = &agent.requests()[0].prompt;
    assert!(prompt.contains("abc123"));
    assert!(prompt.contains("Fix parser"));
}

#[tokio::test]
async fn custom_review_uses_the_instructions_verbatim() {
    let agent = ScriptedAgent::new();
    let mut h = Harness::start(agent.clone());
    let thread_id = start_thread(&mut h, 1, "/repo").await;

    h.request(
        2,
        "review/start",
        json!({
            "threadId": thread_id,
            "target": {"type": "custom", "instructions": "  Check the locking in db.rs  "},
        }),
    )
    .await;
    h.recv_until("turn/completed").await;

    assert_eq!(agent.requests()[0].prompt, "Check the locking in db.rs");
}

#[tokio::test]
async fn bad_targets_are_invalid_params() {
    let mut h = Harness::start(ScriptedAgent::new());
    let thread_id = start_thread(&mut h, 1, "/repo").await;

    let unknown = h
        .request(2, "review/start", json!({"threadId": thread_id, "target": {"type": "pr"}}))
        .await;
    assert_eq!(unknown["error"]["code"], -32602);

    let missing = h
        .request(3, "review/start", json!({"threadId": thread_id, "target": {"type": "baseBranch"}}))
        .await;
    assert_eq!(missing["error"]["code"], -32602);
    assert_eq!(missing["error"]["message"], "Review target requires `branch`");
}

#[tokio::test]
async fn review_of_unknown_thread_is_rejected() {
    let mut h = Harness::start(ScriptedAgent::new());

    let response = h
        .request(
            1,
            "review/start",
            json!({"threadId": "thr_nope", "target": {"type": "uncommittedChanges"}, "delivery": "detached"}),
        )
        .await;
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["error"]["message"], "Thread not found");
}
