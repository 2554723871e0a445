//! Access-mode and approval-policy mapping.
//!
//! Pure, total functions: every input, including absent and unrecognised
//! values, maps to a defined agent parameter.

use serde_json::Value;

/// Tools available to a read-only turn.
pub const READ_ONLY_TOOLS: &[&str] = &["Read", "Glob", "Grep", "WebSearch", "WebFetch"];

/// Tools available to a turn in the default workspace mode.
pub const WORKSPACE_TOOLS: &[&str] = &[
    "Read",
    "Write",
    "Edit",
    "Bash",
    "Glob",
    "Grep",
    "WebSearch",
    "WebFetch",
];

/// How much of the machine a turn may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// No tool restriction.
    FullAccess,
    /// Inspection tools only.
    ReadOnly,
    /// Workspace editing and shell; also the fallback for unknown input.
    Current,
}

impl AccessMode {
    /// Parse the frontend's access mode string.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("full-access") => Self::FullAccess,
            Some("read-only") => Self::ReadOnly,
            _ => Self::Current,
        }
    }

    /// Derive an access mode from a frontend `sandboxPolicy` object.
    #[must_use]
    pub fn from_sandbox_policy(policy: Option<&Value>) -> Self {
        match policy.and_then(|p| p.get("type")).and_then(Value::as_str) {
            Some("dangerFullAccess") => Self::FullAccess,
            Some("readOnly") => Self::ReadOnly,
            _ => Self::Current,
        }
    }

    /// Tool allowlist handed to the agent; `None` means unrestricted.
    #[must_use]
    pub fn allowed_tools(self) -> Option<&'static [&'static str]> {
        match self {
            Self::FullAccess => None,
            Self::ReadOnly => Some(READ_ONLY_TOOLS),
            Self::Current => Some(WORKSPACE_TOOLS),
        }
    }
}

/// When the agent must ask before acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// Never ask.
    Never,
    /// Ask as needed; also the fallback for unknown input.
    OnRequest,
}

impl ApprovalPolicy {
    /// Parse the frontend's approval policy string.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("never") => Self::Never,
            _ => Self::OnRequest,
        }
    }

    /// Permission mode handed to the agent.
    #[must_use]
    pub fn permission_mode(self) -> PermissionMode {
        match self {
            Self::Never => PermissionMode::BypassPermissions,
            Self::OnRequest => PermissionMode::Default,
        }
    }
}

/// Agent-side permission mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionMode {
    /// Ask the peer whenever the agent needs permission.
    #[default]
    Default,
    /// Skip every permission check.
    BypassPermissions,
}

impl PermissionMode {
    /// Value of the CLI's `--permission-mode` flag.
    #[must_use]
    pub fn as_cli_arg(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::BypassPermissions => "bypassPermissions",
        }
    }
}
