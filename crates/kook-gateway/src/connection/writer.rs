//! Outbound writer task
//!
//! Owns the sink half of the socket and forwards queued frames to it.

use futures_util::{Sink, SinkExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Outbound queue depth per session
pub(crate) const OUTBOUND_BUFFER: usize = 32;

/// Spawn the writer; it stops after a Close frame or once every sender is gone
pub(crate) fn spawn<S>(session_id: String, mut sink: S, mut rx: mpsc::Receiver<Message>) -> JoinHandle<()>
where
    S: Sink<Message> + Send + Unpin + 'static,
    S::Error: Display,
{
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if let Err(e) = sink.send(message).await {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "Failed to send frame to gateway"
                );
                break;
            }
            if closing {
                break;
            }
        }

        let _ = sink.close().await;
        tracing::trace!(session_id = %session_id, "Writer stopped");
    })
}
