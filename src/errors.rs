//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// JSON-RPC code for an unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC code for rejected parameters (unknown thread, empty prompt, ...).
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC code for any other handler failure.
pub const INTERNAL_ERROR: i64 = -32603;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or stream I/O failure.
    Io(String),
    /// Framing or protocol-level failure on a newline-delimited stream.
    Protocol(String),
    /// Request parameters were missing or rejected.
    InvalidParams(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// The agent query service failed while producing events.
    Agent(String),
    /// The operation stopped because its cancellation token fired.
    Cancelled(String),
    /// The requested capability is not offered by this bridge.
    Unsupported(String),
    /// Any other unexpected failure.
    Internal(String),
}

impl AppError {
    /// JSON-RPC error code used when this error escapes a request handler.
    #[must_use]
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::InvalidParams(_) | Self::NotFound(_) => INVALID_PARAMS,
            _ => INTERNAL_ERROR,
        }
    }

    /// Message placed in the JSON-RPC error object.
    ///
    /// Parameter errors carry the bare message so that frontends can match
    /// on it (`"Thread not found"`, `"Empty prompt"`); everything else is
    /// reported as an internal error with the stringified cause.
    #[must_use]
    pub fn rpc_message(&self) -> String {
        match self {
            Self::InvalidParams(msg) | Self::NotFound(msg) => msg.clone(),
            other => format!("Internal error: {other}"),
        }
    }

    /// Whether this error is the result of cooperative cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::InvalidParams(msg) => write!(f, "invalid params: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Agent(msg) => write!(f, "agent: {msg}"),
            Self::Cancelled(msg) => write!(f, "cancelled: {msg}"),
            Self::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            Self::Internal(msg) => write!(f, "internal: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
