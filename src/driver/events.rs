//! Decoding of raw agent events.
//!
//! # Recognised shapes
//!
//! | Discriminant                                         | Maps to                          |
//! |------------------------------------------------------|----------------------------------|
//! | `type=system`, `subtype=init`                        | [`AgentEvent::SessionInit`]      |
//! | string `result` field                                | [`AgentEvent::Result`]           |
//! | `type=assistant`                                     | [`AgentEvent::AssistantContent`] |
//! | `type=control_request`, `can_use_tool`               | permission or input request      |
//! | top-level `tool_use_id`, or `user` + `tool_result`   | [`AgentEvent::ToolResults`]      |
//! | *(anything else)*                                    | [`AgentEvent::Ignored`]          |
//!
//! Rows are tested top to bottom and the first match wins, so no event is
//! handled by two branches.

use serde_json::Value;

/// Tool whose permission request is really a question for the user.
pub const ASK_USER_QUESTION_TOOL: &str = "AskUserQuestion";

/// One block of assistant content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Cumulative assistant text.
    Text(String),
    /// A tool invocation.
    ToolUse {
        /// Block id used to correlate the later tool result.
        id: Option<String>,
        /// Tool name.
        name: String,
        /// Tool input.
        input: Value,
    },
    /// Reasoning content.
    Thinking(String),
    /// Any other block type.
    Other,
}

/// Outcome of one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Id of the `tool_use` block this answers, when reported.
    pub tool_use_id: Option<String>,
    /// Result payload as sent by the agent.
    pub content: Value,
    /// Whether the tool reported failure.
    pub is_error: bool,
}

/// The agent asks permission to run a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionRequest {
    /// Agent-side control request id, echoed in the answer.
    pub request_id: String,
    /// Tool name.
    pub tool_name: String,
    /// Proposed tool input.
    pub input: Value,
    /// Id of the tool-use block, when reported.
    pub tool_use_id: Option<String>,
}

/// The agent asks the user to answer questions.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRequest {
    /// Agent-side control request id, echoed in the answer.
    pub request_id: String,
    /// Questions as sent by the agent.
    pub questions: Value,
    /// Full tool input, merged with the answers in the reply.
    pub input: Value,
    /// Id of the tool-use block, when reported.
    pub tool_use_id: Option<String>,
}

/// Closed set of agent events the translator understands.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Session handle for later resumption.
    SessionInit {
        /// Opaque session id.
        session_id: String,
    },
    /// Authoritative cumulative text of the assistant message.
    Result {
        /// Full text.
        text: String,
        /// Whether the agent flagged the result as an error.
        is_error: bool,
    },
    /// Partial assistant message.
    AssistantContent(Vec<ContentBlock>),
    /// Tool call results.
    ToolResults(Vec<ToolResult>),
    /// Permission prompt for a tool call.
    PermissionRequest(PermissionRequest),
    /// Questions for the user.
    InputRequest(InputRequest),
    /// Anything the translator does not act on.
    Ignored,
}

/// Decode a raw event.
#[must_use]
pub fn decode(raw: &Value) -> AgentEvent {
    let event_type = raw.get("type").and_then(Value::as_str);

    if event_type == Some("system") && raw.get("subtype").and_then(Value::as_str) == Some("init")
    {
        return raw
            .get("session_id")
            .and_then(Value::as_str)
            .map_or(AgentEvent::Ignored, |id| AgentEvent::SessionInit {
                session_id: id.to_owned(),
            });
    }

    if let Some(text) = raw.get("result").and_then(Value::as_str) {
        return AgentEvent::Result {
            text: text.to_owned(),
            is_error: raw.get("is_error").and_then(Value::as_bool).unwrap_or(false),
        };
    }

    match event_type {
        Some("assistant") => AgentEvent::AssistantContent(
            message_content(raw).iter().map(decode_block).collect(),
        ),
        Some("control_request") => decode_control_request(raw),
        _ => decode_tool_results(raw),
    }
}

fn message_content(raw: &Value) -> &[Value] {
    raw.get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn decode_block(block: &Value) -> ContentBlock {
    match block.get("type").and_then(Value::as_str) {
        Some("text") => ContentBlock::Text(string_field(block, "text")),
        Some("tool_use") => ContentBlock::ToolUse {
            id: block.get("id").and_then(Value::as_str).map(str::to_owned),
            name: string_field(block, "name"),
            input: block.get("input").cloned().unwrap_or(Value::Null),
        },
        Some("thinking") => ContentBlock::Thinking(string_field(block, "thinking")),
        _ => ContentBlock::Other,
    }
}

fn decode_control_request(raw: &Value) -> AgentEvent {
    let Some(request) = raw.get("request") else {
        return AgentEvent::Ignored;
    };
    if request.get("subtype").and_then(Value::as_str) != Some("can_use_tool") {
        return AgentEvent::Ignored;
    }

    let request_id = string_field(raw, "request_id");
    let tool_name = string_field(request, "tool_name");
    let input = request.get("input").cloned().unwrap_or(Value::Null);
    let tool_use_id = request
        .get("tool_use_id")
        .and_then(Value::as_str)
        .map(str::to_owned);

    if tool_name == ASK_USER_QUESTION_TOOL {
        AgentEvent::InputRequest(InputRequest {
            request_id,
            questions: input
                .get("questions")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
            input,
            tool_use_id,
        })
    } else {
        AgentEvent::PermissionRequest(PermissionRequest {
            request_id,
            tool_name,
            input,
            tool_use_id,
        })
    }
}

fn decode_tool_results(raw: &Value) -> AgentEvent {
    if raw.get("tool_use_id").is_some() {
        return AgentEvent::ToolResults(vec![ToolResult {
            tool_use_id: raw
                .get("tool_use_id")
                .and_then(Value::as_str)
                .map(str::to_owned),
            content: raw.get("content").cloned().unwrap_or(Value::Null),
            is_error: raw.get("is_error").and_then(Value::as_bool).unwrap_or(false),
        }]);
    }

    if raw.get("type").and_then(Value::as_str) != Some("user") {
        return AgentEvent::Ignored;
    }

    let results: Vec<ToolResult> = message_content(raw)
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("tool_result"))
        .map(|block| ToolResult {
            tool_use_id: block
                .get("tool_use_id")
                .and_then(Value::as_str)
                .map(str::to_owned),
            content: block.get("content").cloned().unwrap_or(Value::Null),
            is_error: block
                .get("is_error")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
        .collect();

    if results.is_empty() {
        AgentEvent::Ignored
    } else {
        AgentEvent::ToolResults(results)
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}
