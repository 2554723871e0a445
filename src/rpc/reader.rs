//! Inbound reader loop.
//!
//! Reads newline-delimited JSON from the frontend, classifies each frame, and
//! hands it to the router or the pending-request table. Malformed, oversized,
//! and non-UTF-8 lines produce a `claude-code/parseError` notification; they
//! never stop the loop.

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::rpc::codec::{Frame, FrameCodec};
use crate::rpc::message::{classify, IncomingFrame};
use crate::server::router;
use crate::server::state::AppState;
use crate::Result;

/// Notification emitted for an input line that cannot be decoded.
pub const PARSE_ERROR_METHOD: &str = "claude-code/parseError";

/// Reader task: consume `input` until EOF, an I/O error, or `cancel`.
///
/// Requests are dispatched one at a time; handlers that start long-running
/// work hand it to a background task, so a streaming turn never blocks the
/// next frame.
///
/// # Errors
///
/// Returns `Ok(())` on EOF or cancellation. I/O errors on `input` end the
/// loop and are returned as [`AppError::Io`](crate::AppError::Io).
pub async fn run_reader<R>(state: Arc<AppState>, input: R, cancel: CancellationToken) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    let mut framed = FramedRead::new(input, FrameCodec::new());

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("reader: cancellation received, stopping");
                break;
            }

            item = framed.next() => {
                match item {
                    None => {
                        debug!("reader: EOF on input stream");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "reader: input stream failed, stopping");
                        return Err(e);
                    }
                    Some(Ok(Frame::Rejected(reason))) => {
                        report_parse_error(&state, &reason, "").await;
                    }
                    Some(Ok(Frame::Line(line))) => handle_line(&state, &line).await,
                }
            }
        }
    }

    Ok(())
}

/// Process one inbound line.
pub async fn handle_line(state: &Arc<AppState>, line: &str) {
    if line.trim().is_empty() {
        return;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => {
            report_parse_error(state, &err.to_string(), line).await;
            return;
        }
    };

    match classify(value) {
        IncomingFrame::Request { id, method, params } => {
            router::dispatch(state, Some(id), &method, params).await;
        }
        IncomingFrame::Notification { method, params } => {
            router::dispatch(state, None, &method, params).await;
        }
        IncomingFrame::Response { id, outcome } => {
            state.outbound.resolve(&id, outcome);
        }
        IncomingFrame::Unrecognized(value) => {
            debug!(frame = %value, "reader: dropping frame with neither method nor id");
        }
    }
}

/// Emit `claude-code/parseError`. `raw` is empty for lines the codec
/// discarded.
async fn report_parse_error(state: &AppState, error: &str, raw: &str) {
    warn!(error, "reader: unusable input line");
    let params = json!({ "error": error, "raw": raw });
    if let Err(e) = state.outbound.notify(PARSE_ERROR_METHOD, params).await {
        warn!(error = %e, "reader: failed to report parse error");
    }
}
