//! Answers to the agent's `can_use_tool` control requests.
//!
//! The frontend answers an approval request with a `decision` and a
//! user-input request with `answers`. Both are folded into the agent's
//! `control_response` frame, which either allows the tool call (optionally
//! with rewritten input) or denies it with a message.

use serde_json::{json, Map, Value};

use crate::rpc::outbound::PeerReply;

/// Decisions that allow the tool call. Anything else denies it.
const ALLOWING_DECISIONS: &[&str] = &["accept", "acceptForSession", "approved", "approved_for_session"];

/// Outcome of a permission prompt, as sent back to the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionVerdict {
    /// Run the tool with this input.
    Allow {
        /// Input the tool runs with.
        updated_input: Value,
    },
    /// Refuse the tool call.
    Deny {
        /// Reason shown to the agent.
        message: String,
    },
}

impl PermissionVerdict {
    /// Interpret the frontend's reply to an approval request.
    #[must_use]
    pub fn from_approval(reply: &PeerReply, input: &Value) -> Self {
        match reply {
            Ok(result) => {
                let decision = result.get("decision").and_then(Value::as_str);
                let approved = result.get("approved").and_then(Value::as_bool) == Some(true);
                if approved || decision.is_some_and(|d| ALLOWING_DECISIONS.contains(&d)) {
                    Self::Allow {
                        updated_input: input.clone(),
                    }
                } else {
                    Self::Deny {
                        message: "Denied by user".into(),
                    }
                }
            }
            Err(error) => Self::Deny {
                message: format!("Approval request failed: {}", error_message(error)),
            },
        }
    }

    /// Interpret the frontend's reply to a user-input request. The answers
    /// are merged into the tool input under `answers`.
    #[must_use]
    pub fn from_user_input(reply: &PeerReply, input: &Value) -> Self {
        let answers = match reply {
            Ok(result) => result.get("answers").filter(|a| !a.is_null()),
            Err(error) => {
                return Self::Deny {
                    message: format!("User input request failed: {}", error_message(error)),
                }
            }
        };

        let Some(answers) = answers else {
            return Self::Deny {
                message: "No answers provided".into(),
            };
        };

        let mut updated = match input {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        updated.insert("answers".into(), answers.clone());
        Self::Allow {
            updated_input: Value::Object(updated),
        }
    }

    /// Whether the tool call may proceed.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }
}

/// Build the `control_response` frame for `request_id`.
#[must_use]
pub fn control_response(request_id: &str, verdict: &PermissionVerdict) -> Value {
    let body = match verdict {
        PermissionVerdict::Allow { updated_input } => {
            json!({ "behavior": "allow", "updatedInput": updated_input })
        }
        PermissionVerdict::Deny { message } => json!({ "behavior": "deny", "message": message }),
    };
    json!({
        "type": "control_response",
        "response": {
            "subtype": "success",
            "request_id": request_id,
            "response": body,
        }
    })
}

/// Stream-json user message carrying `prompt`.
#[must_use]
pub fn user_message(prompt: &str) -> Value {
    json!({
        "type": "user",
        "message": {
            "role": "user",
            "content": [{ "type": "text", "text": prompt }],
        }
    })
}

fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map_or_else(|| error.to_string(), str::to_owned)
}
