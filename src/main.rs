#![forbid(unsafe_code)]

//! `claude-app-server`: app-server protocol bridge over stdio.
//!
//! Reads newline-delimited JSON-RPC frames from stdin, drives the `claude`
//! CLI for each turn, and writes responses and notifications to stdout.
//! Diagnostics go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use claude_app_server::config::GlobalConfig;
use claude_app_server::driver::claude_cli::ClaudeCli;
use claude_app_server::server;
use claude_app_server::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "claude-app-server", about = "App-server protocol bridge for the claude CLI", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the agent CLI binary.
    #[arg(long)]
    agent_cli: Option<String>,

    /// Override the thread store location.
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Keep threads in memory only.
    #[arg(long)]
    no_persist: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    install_panic_hook();
    info!(version = env!("CARGO_PKG_VERSION"), "claude-app-server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = match &args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    if let Some(agent_cli) = args.agent_cli {
        config.agent_cli = agent_cli;
    }
    if let Some(state_file) = args.state_file {
        config.state_file = Some(state_file);
    }
    if args.no_persist {
        config.persist_threads = false;
    }
    config.validate()?;
    let config = Arc::new(config);
    info!(
        agent_cli = %config.agent_cli,
        state_file = ?config.state_file_path(),
        "configuration loaded"
    );

    // ── Serve stdio until EOF or signal ─────────────────
    let agent = Arc::new(ClaudeCli::from_config(&config));
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_token.cancel();
    });

    let result = server::run(
        config,
        agent,
        tokio::io::stdin(),
        tokio::io::stdout(),
        shutdown,
    )
    .await;

    if let Err(err) = &result {
        error!(%err, "server stopped with error");
    }
    result
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

/// Route panics into the log instead of raw stderr text.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic| {
        let location = panic
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let message = panic
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| panic.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_owned());
        error!(location = location.as_str(), message = message.as_str(), "panic");
    }));
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the protocol; logs must stay on stderr.
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
