//! Outbound frame handle and pending server-request table.
//!
//! Every component that emits frames holds a clone of [`Outbound`]. Frames are
//! queued on one bounded channel drained by [`run_writer`](super::writer::run_writer),
//! so a producer's frames reach the wire in the order it queued them.
//!
//! Requests issued toward the peer (approval, user input) register a
//! [`oneshot`] sender keyed by a fresh numeric id. When the reader sees a
//! response frame it calls [`Outbound::resolve`] to wake the waiter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::rpc::message::{
    error_frame, notification_frame, request_frame, response_frame, RequestId, RpcError,
};
use crate::{AppError, Result};

/// Reply delivered by the peer: `Ok(result)` or `Err(error object)`.
pub type PeerReply = std::result::Result<Value, Value>;

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<PeerReply>>>>;

/// Cloneable handle used to emit frames toward the frontend.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::Sender<Value>,
    pending: PendingMap,
    next_id: Arc<AtomicI64>,
}

impl Outbound {
    /// Wrap the sending half of the writer queue.
    #[must_use]
    pub fn new(tx: mpsc::Sender<Value>) -> Self {
        Self {
            tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Queue a raw frame.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] if the writer task has stopped.
    pub async fn send(&self, frame: Value) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| AppError::Protocol("outbound queue closed".into()))
    }

    /// Queue a success response.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] if the writer task has stopped.
    pub async fn respond(&self, id: &RequestId, result: Value) -> Result<()> {
        self.send(response_frame(id, result)).await
    }

    /// Queue an error response.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] if the writer task has stopped.
    pub async fn respond_error(&self, id: &RequestId, error: &RpcError) -> Result<()> {
        self.send(error_frame(id, error)).await
    }

    /// Queue a notification.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] if the writer task has stopped.
    pub async fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.send(notification_frame(method, params)).await
    }

    /// Issue a request toward the peer and return the receiver that resolves
    /// when the peer answers.
    ///
    /// Dropping the receiver abandons the request; a late reply is then
    /// logged and discarded by [`Outbound::resolve`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] if the writer task has stopped. The
    /// pending entry is removed again in that case.
    pub async fn request(
        &self,
        method: &str,
        params: Value,
    ) -> Result<(RequestId, oneshot::Receiver<PeerReply>)> {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (reply_tx, reply_rx) = oneshot::channel();
        lock(&self.pending).insert(id.clone(), reply_tx);

        if let Err(err) = self.send(request_frame(&id, method, params)).await {
            lock(&self.pending).remove(&id);
            return Err(err);
        }

        debug!(request_id = %id, method, "server request issued");
        Ok((id, reply_rx))
    }

    /// Deliver a peer response to its waiter. Returns `false` when no request
    /// with that id is pending.
    pub fn resolve(&self, id: &RequestId, reply: PeerReply) -> bool {
        let Some(waiter) = lock(&self.pending).remove(id) else {
            warn!(request_id = %id, "response for unknown or expired server request");
            return false;
        };

        if waiter.send(reply).is_err() {
            debug!(request_id = %id, "server request waiter already gone");
        }
        true
    }

    /// Forget a pending request without resolving it.
    pub fn abandon(&self, id: &RequestId) {
        lock(&self.pending).remove(id);
    }

    /// Number of requests still waiting for a peer reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
