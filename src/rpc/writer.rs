//! NDJSON writer task.
//!
//! Receives JSON values from a tokio [`mpsc`] channel, serialises each to a
//! single-line string, appends `\n`, writes, and flushes. Used for the
//! frontend's stdout and for the agent CLI's stdin.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Writer task: drains `msg_rx` into `sink` until the channel closes or
/// `cancel` fires.
///
/// Frames already queued when every sender is dropped are still written, so
/// a clean shutdown does not lose trailing notifications.
///
/// # Errors
///
/// - [`AppError::Protocol`] if a value cannot be serialised.
/// - [`AppError::Io`] if writing or flushing `sink` fails (the peer closed
///   its end).
pub async fn run_writer<W>(
    label: &str,
    sink: W,
    mut msg_rx: mpsc::Receiver<serde_json::Value>,
    cancel: CancellationToken,
) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut sink = sink;

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(label, "writer: cancellation received, stopping");
                break;
            }

            msg = msg_rx.recv() => {
                let Some(value) = msg else {
                    debug!(label, "writer: message channel closed, stopping");
                    break;
                };

                let mut bytes = serde_json::to_vec(&value).map_err(|e| {
                    AppError::Protocol(format!("failed to serialise outbound frame: {e}"))
                })?;
                bytes.push(b'\n');

                sink.write_all(&bytes).await.map_err(|e| {
                    warn!(label, error = %e, "writer: write failed");
                    AppError::Io(format!("write failed: {e}"))
                })?;
                sink.flush().await.map_err(|e| {
                    warn!(label, error = %e, "writer: flush failed");
                    AppError::Io(format!("flush failed: {e}"))
                })?;
            }
        }
    }

    Ok(())
}
