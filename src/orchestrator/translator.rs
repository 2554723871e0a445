//! Agent event → protocol notification translation.
//!
//! [`TurnTranslator`] is a pure state machine: it owns one turn's assistant
//! message accumulator and turns each decoded [`AgentEvent`] into a list of
//! [`Directive`]s for the turn runner to carry out. It performs no I/O, so
//! delta semantics can be tested without a transport.
//!
//! Assistant text arrives cumulatively. The accumulator remembers how many
//! characters have already been sent and emits only the unsent suffix; text
//! that is not longer than the cursor emits nothing.

use std::collections::HashMap;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::driver::events::{
    decode, AgentEvent, ContentBlock, InputRequest, PermissionRequest, ToolResult,
};

/// Longest reasoning summary, in characters.
pub const REASONING_SUMMARY_CHARS: usize = 200;

/// Item id used when a tool result carries no correlation id.
pub const UNKNOWN_TOOL_ITEM: &str = "tool-unknown";

const FILE_EDIT_TOOLS: &[&str] = &["Write", "Edit", "MultiEdit", "NotebookEdit"];

/// What the peer is being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRequestKind {
    /// Allow or deny a tool call.
    Approval,
    /// Answer the agent's questions.
    UserInput,
}

/// A request to issue toward the peer on behalf of the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRequest {
    /// Protocol method.
    pub method: &'static str,
    /// Request params.
    pub params: Value,
    /// Kind of answer expected.
    pub kind: ServerRequestKind,
    /// Agent-side control request id the answer goes back to.
    pub control_request_id: String,
    /// Tool input proposed by the agent.
    pub input: Value,
}

/// One side effect requested by the translator.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Emit a notification.
    Notify {
        /// Protocol method.
        method: &'static str,
        /// Notification params.
        params: Value,
    },
    /// Record the agent session id on the thread.
    CaptureSession(String),
    /// Ask the peer and relay the answer to the agent.
    ServerRequest(ServerRequest),
}

/// Per-turn translation state.
#[derive(Debug)]
pub struct TurnTranslator {
    thread_id: String,
    turn_id: String,
    message_item_id: String,
    emitted: String,
    cursor: usize,
    tool_names: HashMap<String, String>,
    reasoning_seq: u32,
}

impl TurnTranslator {
    /// Translator for one turn, with a freshly minted assistant-message item.
    #[must_use]
    pub fn new(thread_id: impl Into<String>, turn_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            turn_id: turn_id.into(),
            message_item_id: format!("msg_{}", Uuid::new_v4().simple()),
            emitted: String::new(),
            cursor: 0,
            tool_names: HashMap::new(),
            reasoning_seq: 0,
        }
    }

    /// Id of the assistant-message item.
    #[must_use]
    pub fn message_item_id(&self) -> &str {
        &self.message_item_id
    }

    /// Text sent so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.emitted
    }

    /// The assistant-message item with the text sent so far.
    #[must_use]
    pub fn message_item(&self) -> Value {
        json!({
            "id": self.message_item_id,
            "type": "agentMessage",
            "text": self.emitted,
        })
    }

    /// Decode and translate one raw event.
    pub fn translate(&mut self, raw: &Value) -> Vec<Directive> {
        self.apply(decode(raw))
    }

    /// Translate one decoded event.
    pub fn apply(&mut self, event: AgentEvent) -> Vec<Directive> {
        match event {
            AgentEvent::SessionInit { session_id } => vec![Directive::CaptureSession(session_id)],
            AgentEvent::Result { text, .. } => self.text_delta(&text).into_iter().collect(),
            AgentEvent::AssistantContent(blocks) => blocks
                .into_iter()
                .filter_map(|block| self.content_block(block))
                .collect(),
            AgentEvent::ToolResults(results) => results
                .into_iter()
                .map(|result| self.tool_completed(result))
                .collect(),
            AgentEvent::PermissionRequest(request) => vec![self.approval_request(request)],
            AgentEvent::InputRequest(request) => vec![self.user_input_request(request)],
            AgentEvent::Ignored => Vec::new(),
        }
    }

    fn content_block(&mut self, block: ContentBlock) -> Option<Directive> {
        match block {
            ContentBlock::Text(text) => self.text_delta(&text),
            ContentBlock::ToolUse { id, name, input } => Some(self.tool_started(id, name, input)),
            ContentBlock::Thinking(content) => Some(self.reasoning_started(&content)),
            ContentBlock::Other => None,
        }
    }

    fn text_delta(&mut self, cumulative: &str) -> Option<Directive> {
        let (offset, _) = cumulative.char_indices().nth(self.cursor)?;
        let delta = &cumulative[offset..];

        self.cursor += delta.chars().count();
        self.emitted.push_str(delta);
        Some(notify(
            "item/agentMessage/delta",
            json!({
                "threadId": self.thread_id,
                "turnId": self.turn_id,
                "itemId": self.message_item_id,
                "delta": delta,
            }),
        ))
    }

    fn tool_started(&mut self, id: Option<String>, name: String, input: Value) -> Directive {
        let item_id = tool_item_id(id.as_deref());
        if let Some(id) = id {
            self.tool_names.insert(id, name.clone());
        }
        self.item_event(
            "item/started",
            json!({
                "id": item_id,
                "type": "tool",
                "tool": name,
                "arguments": input,
                "status": "inProgress",
            }),
        )
    }

    fn tool_completed(&mut self, result: ToolResult) -> Directive {
        let item_id = tool_item_id(result.tool_use_id.as_deref());
        let tool = result
            .tool_use_id
            .as_deref()
            .and_then(|id| self.tool_names.remove(id));
        self.item_event(
            "item/completed",
            json!({
                "id": item_id,
                "type": "tool",
                "tool": tool,
                "status": "completed",
                "result": result.content,
                "isError": result.is_error,
            }),
        )
    }

    fn reasoning_started(&mut self, content: &str) -> Directive {
        self.reasoning_seq += 1;
        let summary: String = content.chars().take(REASONING_SUMMARY_CHARS).collect();
        self.item_event(
            "item/started",
            json!({
                "id": format!("reasoning-{}-{}", self.turn_id, self.reasoning_seq),
                "type": "reasoning",
                "summary": summary,
                "content": content,
            }),
        )
    }

    fn approval_request(&self, request: PermissionRequest) -> Directive {
        let method = approval_method(&request.tool_name);
        let mut params = json!({
            "threadId": self.thread_id,
            "turnId": self.turn_id,
            "itemId": tool_item_id(request.tool_use_id.as_deref()),
            "tool": request.tool_name,
            "input": request.input.clone(),
        });
        if let Some(command) = request.input.get("command").and_then(Value::as_str) {
            params["command"] = Value::String(command.to_owned());
        }
        if let Some(path) = request.input.get("file_path").and_then(Value::as_str) {
            params["path"] = Value::String(path.to_owned());
        }

        Directive::ServerRequest(ServerRequest {
            method,
            params,
            kind: ServerRequestKind::Approval,
            control_request_id: request.request_id,
            input: request.input,
        })
    }

    fn user_input_request(&self, request: InputRequest) -> Directive {
        Directive::ServerRequest(ServerRequest {
            method: "item/tool/requestUserInput",
            params: json!({
                "threadId": self.thread_id,
                "turnId": self.turn_id,
                "itemId": tool_item_id(request.tool_use_id.as_deref()),
                "questions": request.questions,
            }),
            kind: ServerRequestKind::UserInput,
            control_request_id: request.request_id,
            input: request.input,
        })
    }

    fn item_event(&self, method: &'static str, item: Value) -> Directive {
        notify(
            method,
            json!({
                "threadId": self.thread_id,
                "turnId": self.turn_id,
                "item": item,
            }),
        )
    }
}

fn notify(method: &'static str, params: Value) -> Directive {
    Directive::Notify { method, params }
}

/// Approval method for a tool: shell commands and file edits get dedicated
/// prompts, everything else the generic one.
#[must_use]
pub fn approval_method(tool_name: &str) -> &'static str {
    if tool_name == "Bash" {
        "item/commandExecution/requestApproval"
    } else if FILE_EDIT_TOOLS.contains(&tool_name) {
        "item/fileChange/requestApproval"
    } else {
        "item/tool/requestApproval"
    }
}

fn tool_item_id(tool_use_id: Option<&str>) -> String {
    tool_use_id.map_or_else(|| UNKNOWN_TOOL_ITEM.to_owned(), |id| format!("tool-{id}"))
}
