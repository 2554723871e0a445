//! Frame model and classification.
//!
//! | Shape                                   | Kind                           |
//! |-----------------------------------------|--------------------------------|
//! | `{id, method, params?}`                 | [`IncomingFrame::Request`]     |
//! | `{method, params?}`                     | [`IncomingFrame::Notification`]|
//! | `{id, result}` / `{id, error}`          | [`IncomingFrame::Response`]    |
//! | anything else                           | [`IncomingFrame::Unrecognized`]|

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};
use crate::AppError;

/// Correlation id of a request. The protocol allows numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id that fits an `i64`.
    Number(i64),
    /// Numeric id above `i64::MAX`.
    Unsigned(u64),
    /// String id.
    String(String),
}

impl RequestId {
    /// Extract an id from a raw JSON value. `null`, floats, and other shapes
    /// count as "no id".
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::Number)
                .or_else(|| n.as_u64().map(Self::Unsigned)),
            Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Unsigned(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// Error object carried by an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

impl RpcError {
    /// `-32601` for a request naming an unknown method.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
        }
    }

    /// `-32602` with the given message.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: message.into(),
        }
    }

    /// `-32603` with the stringified cause.
    #[must_use]
    pub fn internal(cause: impl Display) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: format!("Internal error: {cause}"),
        }
    }
}

impl From<&AppError> for RpcError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.rpc_code(),
            message: err.rpc_message(),
        }
    }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingFrame {
    /// Carries an id and expects exactly one response.
    Request {
        /// Correlation id echoed in the response.
        id: RequestId,
        /// Method name.
        method: String,
        /// Parameters, `Value::Null` when absent.
        params: Value,
    },
    /// No id; never answered.
    Notification {
        /// Method name.
        method: String,
        /// Parameters, `Value::Null` when absent.
        params: Value,
    },
    /// Reply to a request this side issued.
    Response {
        /// Id of the request being answered.
        id: RequestId,
        /// `Ok(result)` or `Err(error object)`.
        outcome: Result<Value, Value>,
    },
    /// A JSON value that fits none of the shapes above.
    Unrecognized(Value),
}

/// Classify a parsed JSON value.
#[must_use]
pub fn classify(value: Value) -> IncomingFrame {
    let Value::Object(mut map) = value else {
        return IncomingFrame::Unrecognized(value);
    };

    let id = map.get("id").and_then(RequestId::from_value);
    let method = map
        .get("method")
        .and_then(Value::as_str)
        .map(str::to_owned);

    match (id, method) {
        (Some(id), Some(method)) => IncomingFrame::Request {
            id,
            method,
            params: map.remove("params").unwrap_or(Value::Null),
        },
        (None, Some(method)) => IncomingFrame::Notification {
            method,
            params: map.remove("params").unwrap_or(Value::Null),
        },
        (Some(id), None) => {
            if let Some(error) = map.remove("error") {
                IncomingFrame::Response {
                    id,
                    outcome: Err(error),
                }
            } else if let Some(result) = map.remove("result") {
                IncomingFrame::Response {
                    id,
                    outcome: Ok(result),
                }
            } else {
                IncomingFrame::Unrecognized(Value::Object(map))
            }
        }
        (None, None) => IncomingFrame::Unrecognized(Value::Object(map)),
    }
}

/// Build a success response frame.
#[must_use]
pub fn response_frame(id: &RequestId, result: Value) -> Value {
    json!({ "id": id, "result": result })
}

/// Build an error response frame.
#[must_use]
pub fn error_frame(id: &RequestId, error: &RpcError) -> Value {
    json!({ "id": id, "error": { "code": error.code, "message": error.message } })
}

/// Build a notification frame.
#[must_use]
pub fn notification_frame(method: &str, params: Value) -> Value {
    json!({ "method": method, "params": params })
}

/// Build a request frame.
#[must_use]
pub fn request_frame(id: &RequestId, method: &str, params: Value) -> Value {
    json!({ "id": id, "method": method, "params": params })
}
