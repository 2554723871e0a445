//! Protocol server: shared state, routing, handlers, and the serve loop.
//!
//! ```text
//! input ─► run_reader ─► router::dispatch ─► handler ─► Outbound ─► run_writer ─► output
//!                                  └─► turn task (TaskTracker) ─┘
//! ```
//!
//! The server runs until the input reaches EOF or `shutdown` fires. It then
//! interrupts every active turn, gives turn tasks a grace period to emit
//! their terminal notifications, and drains the outbound queue.

pub mod handlers;
pub mod router;
pub mod state;

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::driver::AgentQueryService;
use crate::rpc::outbound::Outbound;
use crate::rpc::reader::run_reader;
use crate::rpc::writer::run_writer;
use crate::server::state::AppState;
use crate::Result;

/// Create the outbound queue sized by `config`.
#[must_use]
pub fn outbound_channel(config: &GlobalConfig) -> (Outbound, mpsc::Receiver<Value>) {
    let (tx, rx) = mpsc::channel(config.outbound_queue_depth);
    (Outbound::new(tx), rx)
}

/// Build state from `config` and serve `input`/`output` until EOF or
/// `shutdown`.
///
/// # Errors
///
/// Returns [`AppError::Io`](crate::AppError::Io) if reading `input` or
/// writing `output` fails.
pub async fn run<R, W>(
    config: Arc<GlobalConfig>,
    agent: Arc<dyn AgentQueryService>,
    input: R,
    output: W,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbound, outbound_rx) = outbound_channel(&config);
    let state = Arc::new(AppState::new(config, agent, outbound));
    serve(state, outbound_rx, input, output, shutdown).await
}

/// Serve with prepared state. `outbound_rx` must be the receiving half of
/// the queue behind `state.outbound`.
///
/// # Errors
///
/// Returns [`AppError::Io`](crate::AppError::Io) if reading `input` or
/// writing `output` fails.
pub async fn serve<R, W>(
    state: Arc<AppState>,
    outbound_rx: mpsc::Receiver<Value>,
    input: R,
    output: W,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let grace = state.config.shutdown_grace();
    let writer_cancel = CancellationToken::new();
    let mut writer = tokio::spawn(run_writer(
        "frontend",
        output,
        outbound_rx,
        writer_cancel.clone(),
    ));

    info!("serving");
    let read_result = run_reader(Arc::clone(&state), input, shutdown).await;

    // ── Drain ────────────────────────────────────────────
    let interrupted = state.turns.cancel_all();
    if interrupted > 0 {
        info!(interrupted, "interrupting active turns for shutdown");
    }
    state.tasks.close();
    if tokio::time::timeout(grace, state.tasks.wait()).await.is_err() {
        warn!(
            remaining = state.tasks.len(),
            "shutdown grace elapsed with tasks still running"
        );
    }
    drop(state);

    let write_result = match tokio::time::timeout(grace, &mut writer).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => {
            warn!(error = %join_err, "writer task failed");
            Ok(())
        }
        Err(_) => {
            warn!("outbound queue not drained within grace period");
            writer_cancel.cancel();
            let _ = writer.await;
            Ok(())
        }
    };

    info!("server stopped");
    read_result.and(write_result)
}
