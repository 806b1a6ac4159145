//! Gateway session
//!
//! One accepted connection: its id, the running max `sn` and the tasks that
//! live exactly as long as it does.

use super::heartbeat::{self, HeartbeatConfig};
use super::writer::{self, OUTBOUND_BUFFER};
use futures_util::Sink;
use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// State shared between the session and its heartbeat task
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    max_sn: AtomicU64,
    ping_outstanding: AtomicBool,
    last_ping_at: Mutex<Option<Instant>>,
    last_pong_at: Mutex<Option<Instant>>,
}

impl SessionState {
    pub(crate) fn current_sn(&self) -> u64 {
        self.max_sn.load(Ordering::SeqCst)
    }

    pub(crate) fn ping_outstanding(&self) -> bool {
        self.ping_outstanding.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_ping_sent(&self) {
        *self.last_ping_at.lock() = Some(Instant::now());
        self.ping_outstanding.store(true, Ordering::SeqCst);
    }
}

/// A live gateway session
pub struct Session {
    /// Session id assigned by Hello
    id: String,

    /// URL this session is connected to
    gateway_url: String,

    state: Arc<SessionState>,

    /// Channel to the writer task
    outbound: mpsc::Sender<Message>,

    /// Pong latency above this is logged
    pong_timeout: Duration,

    heartbeat_task: JoinHandle<()>,

    /// Set once the client starts reading from this session
    receive_task: Mutex<Option<JoinHandle<()>>>,

    cancelled: AtomicBool,
}

impl Session {
    /// Start the writer and heartbeat tasks for an accepted connection
    pub(crate) fn establish<S>(
        id: String,
        gateway_url: String,
        sink: S,
        heartbeat: HeartbeatConfig,
    ) -> Arc<Self>
    where
        S: Sink<Message> + Send + Unpin + 'static,
        S::Error: Display,
    {
        let state = Arc::new(SessionState::default());
        let (outbound, rx) = mpsc::channel(OUTBOUND_BUFFER);

        // The writer ends on its own once every sender is dropped
        let _writer = writer::spawn(id.clone(), sink, rx);
        let heartbeat_task = heartbeat::spawn(id.clone(), state.clone(), outbound.clone(), heartbeat);

        Arc::new(Self {
            id,
            gateway_url,
            state,
            outbound,
            pong_timeout: heartbeat.pong_timeout,
            heartbeat_task,
            receive_task: Mutex::new(None),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Get the session id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    /// Highest `sn` observed so far
    #[must_use]
    pub fn current_sn(&self) -> u64 {
        self.state.current_sn()
    }

    /// Merge an incoming `sn` into the running max, returning the previous max
    pub fn observe_sn(&self, sn: u64) -> u64 {
        self.state.max_sn.fetch_max(sn, Ordering::SeqCst)
    }

    /// Record a Pong, returning the latency since the last Ping if one was outstanding
    pub fn record_pong(&self) -> Option<Duration> {
        let now = Instant::now();
        *self.state.last_pong_at.lock() = Some(now);

        if !self.state.ping_outstanding.swap(false, Ordering::SeqCst) {
            return None;
        }
        let latency = (*self.state.last_ping_at.lock()).map(|sent| now.duration_since(sent));

        if let Some(latency) = latency {
            if latency > self.pong_timeout {
                tracing::warn!(
                    session_id = %self.id,
                    latency_ms = latency.as_millis(),
                    "Pong arrived later than expected"
                );
            }
        }
        latency
    }

    /// Check if the last Ping has been answered
    #[must_use]
    pub fn is_heartbeat_acked(&self) -> bool {
        !self.state.ping_outstanding()
    }

    #[must_use]
    pub fn last_pong_at(&self) -> Option<Instant> {
        *self.state.last_pong_at.lock()
    }

    /// Check if the heartbeat task is still running
    #[must_use]
    pub fn is_heartbeat_running(&self) -> bool {
        !self.heartbeat_task.is_finished()
    }

    /// Queue a frame for the writer
    pub async fn send(&self, message: Message) -> bool {
        self.outbound.send(message).await.is_ok()
    }

    pub(crate) fn attach_receiver(&self, handle: JoinHandle<()>) {
        let mut slot = self.receive_task.lock();
        if self.is_cancelled() {
            handle.abort();
        } else {
            *slot = Some(handle);
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stop the heartbeat and receive tasks and close the socket
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        self.heartbeat_task.abort();
        if let Some(handle) = self.receive_task.lock().take() {
            handle.abort();
        }
        let _ = self.outbound.try_send(Message::Close(None));

        tracing::debug!(session_id = %self.id, "Session cancelled");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.heartbeat_task.abort();
        if let Some(handle) = self.receive_task.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("gateway_url", &self.gateway_url)
            .field("sn", &self.current_sn())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
