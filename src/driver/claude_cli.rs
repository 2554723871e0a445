//! Agent query service backed by the `claude` CLI.
//!
//! Each query spawns one headless process in stream-json mode:
//!
//! ```text
//! claude -p --output-format stream-json --input-format stream-json --verbose \
//!        --permission-prompt-tool stdio --permission-mode <mode> \
//!        [--allowedTools a,b] [--resume <session>] [--model <model>]
//! ```
//!
//! The prompt goes in as a stream-json user message on stdin; stdout events
//! are forwarded as-is. Control responses share the stdin writer, which is
//! closed once the agent reports its `result` so the process can exit.
//!
//! The child gets `env_clear()` plus an allowlist, and `kill_on_drop(true)`.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::GlobalConfig;
use crate::driver::control::user_message;
use crate::driver::{AgentControl, AgentQueryService, AgentStream, QueryRequest};
use crate::rpc::codec::{Frame, FrameCodec};
use crate::rpc::writer::run_writer;
use crate::{AppError, Result};

// ── Environment allowlist ────────────────────────────────────────────────────

/// Variables inherited verbatim by the agent process.
pub const ALLOWED_ENV_VARS: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "SHELL",
    "TERM",
    "LANG",
    "LC_ALL",
    "TMPDIR",
    "XDG_CONFIG_HOME",
    "RUST_LOG",
    // Windows-specific variables.
    "USERPROFILE",
    "SystemRoot",
    "TEMP",
    "TMP",
    "APPDATA",
    "LOCALAPPDATA",
    "COMSPEC",
];

/// Prefixes of variables inherited by the agent process (credentials and
/// provider selection).
pub const ALLOWED_ENV_PREFIXES: &[&str] = &["ANTHROPIC_", "CLAUDE_", "AWS_", "GOOGLE_"];

const EVENT_BUFFER: usize = 64;
const CONTROL_BUFFER: usize = 16;
const STDERR_TAIL_LINES: usize = 20;

// ── Service ──────────────────────────────────────────────────────────────────

/// Spawns the `claude` CLI for every query.
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    program: String,
    extra_args: Vec<String>,
    default_model: Option<String>,
}

impl ClaudeCli {
    /// Service running `program` with `extra_args` placed before the
    /// generated arguments.
    #[must_use]
    pub fn new(program: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            extra_args,
            default_model: None,
        }
    }

    /// Service configured from `[agent_cli]` settings.
    #[must_use]
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            program: config.agent_cli.clone(),
            extra_args: config.agent_cli_args.clone(),
            default_model: config.default_model.clone(),
        }
    }

    /// Command-line arguments for `request`.
    #[must_use]
    pub fn build_args(&self, request: &QueryRequest) -> Vec<String> {
        let mut args = self.extra_args.clone();
        args.extend(
            [
                "-p",
                "--output-format",
                "stream-json",
                "--input-format",
                "stream-json",
                "--verbose",
                "--permission-prompt-tool",
                "stdio",
                "--permission-mode",
                request.permission_mode.as_cli_arg(),
            ]
            .map(str::to_owned),
        );

        if let Some(tools) = &request.allowed_tools {
            args.push("--allowedTools".into());
            args.push(tools.join(","));
        }
        if let Some(session) = &request.resume_session_id {
            args.push("--resume".into());
            args.push(session.clone());
        }
        if let Some(model) = request.model.as_ref().or(self.default_model.as_ref()) {
            args.push("--model".into());
            args.push(model.clone());
        }
        args
    }

    fn command(&self, request: &QueryRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(request));

        cmd.env_clear();
        for (key, value) in std::env::vars_os() {
            let Some(name) = key.to_str() else { continue };
            if ALLOWED_ENV_VARS.contains(&name)
                || ALLOWED_ENV_PREFIXES.iter().any(|p| name.starts_with(p))
            {
                cmd.env(&key, value);
            }
        }

        if !request.cwd.is_empty() {
            cmd.current_dir(&request.cwd);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn spawn(&self, request: QueryRequest, cancel: CancellationToken) -> Result<AgentStream> {
        let mut child = self
            .command(&request)
            .spawn()
            .map_err(|err| AppError::Agent(format!("failed to spawn agent: {err}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Agent("failed to capture agent stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Agent("failed to capture agent stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Agent("failed to capture agent stderr".into()))?;

        info!(
            program = %self.program,
            cwd = %request.cwd,
            resume = request.resume_session_id.is_some(),
            "agent process spawned"
        );

        let (control_tx, control_rx) = mpsc::channel::<Value>(CONTROL_BUFFER);
        control_tx
            .send(user_message(&request.prompt))
            .await
            .map_err(|_| AppError::Agent("agent stdin closed before prompt".into()))?;

        let stdin_close = CancellationToken::new();
        let writer_close = stdin_close.clone();
        tokio::spawn(async move {
            if let Err(err) = run_writer("agent-stdin", stdin, control_rx, writer_close).await {
                debug!(%err, "agent stdin writer stopped");
            }
        });

        let stderr_tail = tokio::spawn(collect_stderr_tail(stderr));
        let (event_tx, event_rx) = mpsc::channel::<Result<Value>>(EVENT_BUFFER);
        tokio::spawn(pump_events(
            child,
            stdout,
            event_tx,
            stdin_close,
            cancel,
            stderr_tail,
        ));

        let events = futures_util::stream::unfold(event_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();

        Ok(AgentStream {
            events,
            control: AgentControl::new(control_tx),
        })
    }
}

impl AgentQueryService for ClaudeCli {
    fn query(
        &self,
        request: QueryRequest,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<AgentStream>> + Send + '_>> {
        Box::pin(self.spawn(request, cancel))
    }
}

// ── Stream pump ──────────────────────────────────────────────────────────────

/// Forward stdout events until EOF, then report abnormal exits.
///
/// Cancellation kills the child and ends the stream with
/// [`AppError::Cancelled`]. A process that exits non-zero without emitting a
/// `result` ends the stream with [`AppError::Agent`] carrying its stderr tail.
async fn pump_events(
    mut child: Child,
    stdout: ChildStdout,
    event_tx: mpsc::Sender<Result<Value>>,
    stdin_close: CancellationToken,
    cancel: CancellationToken,
    stderr_tail: JoinHandle<String>,
) {
    let mut framed = FramedRead::new(stdout, FrameCodec::new());
    let mut saw_result = false;

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                stdin_close.cancel();
                if let Err(err) = child.kill().await {
                    warn!(%err, "failed to kill agent process");
                }
                let _ = event_tx.send(Err(AppError::Cancelled("turn interrupted".into()))).await;
                return;
            }

            item = framed.next() => match item {
                None => break,
                Some(Ok(Frame::Rejected(reason))) => {
                    warn!(reason = reason.as_str(), "skipping unusable agent output line");
                }
                Some(Err(err)) => {
                    stdin_close.cancel();
                    let _ = event_tx
                        .send(Err(AppError::Agent(format!("agent stream failed: {err}"))))
                        .await;
                    return;
                }
                Some(Ok(Frame::Line(line))) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let value = match serde_json::from_str::<Value>(&line) {
                        Ok(value) => value,
                        Err(err) => {
                            debug!(%err, "skipping non-json agent output");
                            continue;
                        }
                    };

                    let is_result = value.get("type").and_then(Value::as_str) == Some("result");
                    if event_tx.send(Ok(value)).await.is_err() {
                        debug!("event consumer gone, stopping agent");
                        stdin_close.cancel();
                        if let Err(err) = child.kill().await {
                            warn!(%err, "failed to kill agent process");
                        }
                        return;
                    }
                    if is_result {
                        saw_result = true;
                        stdin_close.cancel();
                    }
                }
            }
        }
    }

    stdin_close.cancel();
    let status = child.wait().await;
    if saw_result {
        return;
    }

    let failure = match status {
        Ok(status) if status.success() => return,
        Ok(status) => {
            let tail = stderr_tail.await.unwrap_or_default();
            if tail.is_empty() {
                format!("agent exited with {status}")
            } else {
                format!("agent exited with {status}: {tail}")
            }
        }
        Err(err) => format!("failed to wait for agent: {err}"),
    };
    warn!(failure = failure.as_str(), "agent process failed");
    let _ = event_tx.send(Err(AppError::Agent(failure))).await;
}

async fn collect_stderr_tail(stderr: ChildStderr) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!(line = line.as_str(), "agent stderr");
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Ok(None) => break,
            Err(err) => {
                debug!(%err, "agent stderr read failed");
                break;
            }
        }
    }

    tail.into_iter().collect::<Vec<_>>().join("\n")
}
