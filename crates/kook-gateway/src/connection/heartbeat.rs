//! Heartbeat task
//!
//! Sends a Ping carrying the highest seen `sn` on a jittered interval.

use super::session::SessionState;
use crate::protocol::ping_frame;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Heartbeat timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Base interval between Pings
    pub interval: Duration,
    /// Maximum deviation from `interval`, in either direction
    pub jitter: Duration,
    /// Expected Pong latency, observed only
    pub pong_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            jitter: Duration::from_secs(5),
            pong_timeout: Duration::from_secs(6),
        }
    }
}

/// Pick the next wait: `interval ± rand(0..=jitter)`
///
/// Jitter is capped at half the interval so the wait never collapses to zero.
pub fn next_interval<R: Rng + ?Sized>(rng: &mut R, interval: Duration, jitter: Duration) -> Duration {
    let jitter = jitter.min(interval / 2);
    let jitter_ms = u64::try_from(jitter.as_millis()).unwrap_or(u64::MAX);
    if jitter_ms == 0 {
        return interval;
    }

    let offset = Duration::from_millis(rng.gen_range(0..=jitter_ms));
    if rng.gen_bool(0.5) {
        interval.saturating_add(offset)
    } else {
        interval.saturating_sub(offset)
    }
}

/// Spawn the heartbeat loop for one session
pub(crate) fn spawn(
    session_id: String,
    state: Arc<SessionState>,
    outbound: mpsc::Sender<Message>,
    config: HeartbeatConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = next_interval(&mut rand::thread_rng(), config.interval, config.jitter);
            tokio::time::sleep(wait).await;

            if state.ping_outstanding() {
                tracing::warn!(
                    session_id = %session_id,
                    "Previous Ping was not acknowledged"
                );
            }

            let sn = state.current_sn();
            if outbound.send(Message::Text(ping_frame(sn))).await.is_err() {
                tracing::debug!(session_id = %session_id, "Writer closed, stopping heartbeat");
                break;
            }
            state.mark_ping_sent();

            tracing::trace!(session_id = %session_id, sn, wait_ms = wait.as_millis(), "Ping sent");
        }
    })
}
