//! Global configuration parsing and validation.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

fn default_agent_cli() -> String {
    "claude".into()
}

fn default_true() -> bool {
    true
}

fn default_outbound_queue_depth() -> usize {
    256
}

fn default_shutdown_grace_seconds() -> u64 {
    5
}

/// Global configuration parsed from an optional `config.toml`.
///
/// Every field has a default, so an empty document is a valid configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Agent CLI binary driven in `stream-json` mode.
    #[serde(default = "default_agent_cli")]
    pub agent_cli: String,
    /// Extra arguments placed before the bridge's own CLI flags.
    #[serde(default)]
    pub agent_cli_args: Vec<String>,
    /// Model used when a turn does not name one; also marked as default in
    /// `model/list`.
    #[serde(default)]
    pub default_model: Option<String>,
    /// Location of the thread store. Defaults to
    /// `$HOME/.claude-app-server/threads.json`.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    /// JSON file holding `mcpServers`. Defaults to `$HOME/.claude.json`.
    #[serde(default)]
    pub mcp_config_path: Option<PathBuf>,
    /// Whether threads are saved to and loaded from `state_file`.
    #[serde(default = "default_true")]
    pub persist_threads: bool,
    /// Allow more than one active turn per thread.
    #[serde(default)]
    pub allow_concurrent_turns: bool,
    /// Capacity of the outbound frame queue.
    #[serde(default = "default_outbound_queue_depth")]
    pub outbound_queue_depth: usize,
    /// Time granted to in-flight turns after the input stream closes.
    #[serde(default = "default_shutdown_grace_seconds")]
    pub shutdown_grace_seconds: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            agent_cli: default_agent_cli(),
            agent_cli_args: Vec::new(),
            default_model: None,
            state_file: None,
            mcp_config_path: None,
            persist_threads: true,
            allow_concurrent_turns: false,
            outbound_queue_depth: default_outbound_queue_depth(),
            shutdown_grace_seconds: default_shutdown_grace_seconds(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolved thread store path, or `None` when persistence is disabled or
    /// no home directory is known.
    #[must_use]
    pub fn state_file_path(&self) -> Option<PathBuf> {
        if !self.persist_threads {
            return None;
        }
        self.state_file.clone().or_else(|| {
            home_dir().map(|home| home.join(".claude-app-server").join("threads.json"))
        })
    }

    /// Resolved path of the JSON file listing MCP servers.
    #[must_use]
    pub fn mcp_config_file(&self) -> Option<PathBuf> {
        self.mcp_config_path
            .clone()
            .or_else(|| home_dir().map(|home| home.join(".claude.json")))
    }

    /// Grace period granted to running turns at shutdown.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.agent_cli.trim().is_empty() {
            return Err(AppError::Config("agent_cli must not be empty".into()));
        }

        if self.outbound_queue_depth == 0 {
            return Err(AppError::Config(
                "outbound_queue_depth must be greater than zero".into(),
            ));
        }

        if let Some(model) = &self.default_model {
            if model.trim().is_empty() {
                return Err(AppError::Config(
                    "default_model must not be blank when set".into(),
                ));
            }
        }

        Ok(())
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
