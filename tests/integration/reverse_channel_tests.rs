//! Server-initiated approval and user-input requests, relayed back to the
//! agent as control responses.

use std::time::Duration;

use serde_json::{json, Value};

use super::test_helpers::{
    permission_request, result_event, start_thread, Harness, ScriptedAgent, Step,
};

async fn wait_for_control(agent: &ScriptedAgent) -> Value {
    for _ in 0..100 {
        if let Some(message) = agent.control_messages().into_iter().next() {
            return message;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("agent never received a control message");
}

/// Start a turn on a fresh thread and return the first server request.
async fn start_and_take_request(h: &mut Harness) -> Value {
    let thread_id = start_thread(h, 1, "/repo").await;
    h.request(
        2,
        "turn/start",
        json!({"threadId": thread_id, "input": [{"type": "text", "text": "do it"}]}),
    )
    .await;

    loop {
        let frame = h.recv().await;
        if frame.get("id").is_some() && frame.get("method").is_some() {
            return frame;
        }
    }
}

#[tokio::test]
async fn accepted_command_approval_allows_the_tool() {
    let agent = ScriptedAgent::new();
    agent.push_script(vec![
        Step::Event(permission_request("req-1", "Bash", json!({"command": "ls -la"}))),
        Step::WaitForControl,
        Step::Event(result_event("listed")),
    ]);
    let mut h = Harness::start(agent.clone());

    let request = start_and_take_request(&mut h).await;
    assert_eq!(request["method"], "item/commandExecution/requestApproval");
    assert_eq!(request["params"]["command"], "ls -la");
    assert_eq!(request["params"]["itemId"], "tool-tu_1");

    h.send(json!({"id": request["id"], "result": {"decision": "accept"}}))
        .await;
    h.recv_until("turn/completed").await;

    let control = wait_for_control(&agent).await;
    assert_eq!(control["type"], "control_response");
    assert_eq!(control["response"]["request_id"], "req-1");
    assert_eq!(control["response"]["response"]["behavior"], "allow");
    assert_eq!(
        control["response"]["response"]["updatedInput"],
        json!({"command": "ls -la"})
    );
}

#[tokio::test]
async fn declined_file_change_denies_the_tool() {
    let agent = ScriptedAgent::new();
    agent.push_script(vec![
        Step::Event(permission_request(
            "req-2",
            "Edit",
            json!({"file_path": "/repo/main.rs", "old_string": "a", "new_string": "b"}),
        )),
        Step::WaitForControl,
        Step::Event(result_event("skipped")),
    ]);
    let mut h = Harness::start(agent.clone());

    let request = start_and_take_request(&mut h).await;
    assert_eq!(request["method"], "item/fileChange/requestApproval");
    assert_eq!(request["params"]["path"], "/repo/main.rs");

    h.send(json!({"id": request["id"], "result": {"decision": "decline"}}))
        .await;
    h.recv_until("turn/completed").await;

    let control = wait_for_control(&agent).await;
    assert_eq!(control["response"]["response"]["behavior"], "deny");
    assert_eq!(control["response"]["response"]["message"], "Denied by user");
}

#[tokio::test]
async fn error_reply_denies_the_tool() {
    let agent = ScriptedAgent::new();
    agent.push_script(vec![
        Step::Event(permission_request("req-3", "WebFetch", json!({"url": "https://x"}))),
        Step::WaitForControl,
        Step::Event(result_event("ok")),
    ]);
    let mut h = Harness::start(agent.clone());

    let request = start_and_take_request(&mut h).await;
    assert_eq!(request["method"], "item/tool/requestApproval");

    h.send(json!({"id": request["id"], "error": {"code": -1, "message": "ui closed"}}))
        .await;
    h.recv_until("turn/completed").await;

    let control = wait_for_control(&agent).await;
    assert_eq!(control["response"]["response"]["behavior"], "deny");
    assert!(control["response"]["response"]["message"]
        .as_str()
        .is_some_and(|m| m.contains("ui closed")));
}

#[tokio::test]
async fn user_input_answers_are_merged_into_the_tool_input() {
    let agent = ScriptedAgent::new();
    let questions = json!([{"question": "Which db?", "options": ["pg", "sqlite"]}]);
    agent.push_script(vec![
        Step::Event(permission_request(
            "req-4",
            "AskUserQuestion",
            json!({"questions": questions}),
        )),
        Step::WaitForControl,
        Step::Event(result_event("thanks")),
    ]);
    let mut h = Harness::start(agent.clone());

    let request = start_and_take_request(&mut h).await;
    assert_eq!(request["method"], "item/tool/requestUserInput");
    assert_eq!(request["params"]["questions"], questions);

    h.send(json!({"id": request["id"], "result": {"answers": {"Which db?": "pg"}}}))
        .await;
    h.recv_until("turn/completed").await;

    let control = wait_for_control(&agent).await;
    let response = &control["response"]["response"];
    assert_eq!(response["behavior"], "allow");
    assert_eq!(response["updatedInput"]["answers"], json!({"Which db?": "pg"}));
    assert_eq!(response["updatedInput"]["questions"], questions);
}

#[tokio::test]
async fn interrupt_abandons_a_pending_request() {
    let agent = ScriptedAgent::new();
    agent.push_script(vec![
        Step::Event(permission_request("req-5", "Bash", json!({"command": "rm -rf build"}))),
        Step::WaitForCancel,
    ]);
    let mut h = Harness::start(agent.clone());

    let request = start_and_take_request(&mut h).await;
    let turn_id = request["params"]["turnId"].clone();
    let thread_id = request["params"]["threadId"].clone();

    h.request(3, "turn/interrupt", json!({"threadId": thread_id, "turnId": turn_id}))
        .await;
    h.recv_until("turn/interrupted").await;

    // A late answer has nowhere to go.
    h.send(json!({"id": request["id"], "result": {"decision": "accept"}}))
        .await;
    h.assert_silent(Duration::from_millis(200)).await;
    assert!(agent.control_messages().is_empty());
    assert_eq!(h.state.outbound.pending_count(), 0);
}
