//! Receive loop
//!
//! Reads frames for one session, tracks `sn` and feeds events to the
//! processor chains.

use super::gateway_client::ClientInner;
use crate::connection::Session;
use crate::events::{EventRegistry, EventSignal, LazyEvent};
use crate::processors::ProcessorChain;
use crate::protocol::{describe_close, frame_text, ReconnectPayload, Signal};
use futures_util::{Stream, StreamExt};
use std::sync::{Arc, Weak};
use tokio_tungstenite::tungstenite::{self, Message};

/// Why a receive loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoopExit {
    /// Server sent a Reconnect signal
    Reconnect(ReconnectPayload),
    /// Transport closed or failed
    Disconnected(String),
}

/// Per-session receive loop
pub(crate) struct EventLoop {
    pub(crate) client: Weak<ClientInner>,
    pub(crate) session: Arc<Session>,
    pub(crate) registry: Arc<EventRegistry>,
    pub(crate) chain: Arc<ProcessorChain>,
    pub(crate) compress: bool,
    pub(crate) event_process_async: bool,
}

impl EventLoop {
    /// Read until the session ends, then report back to the client
    pub(crate) async fn run<S>(self, mut reader: S)
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        let exit = self.receive(&mut reader).await;
        drop(reader);

        tracing::debug!(session_id = %self.session.id(), exit = ?exit, "Receive loop ended");

        if let Some(client) = self.client.upgrade() {
            client.on_loop_exit(&self.session, exit);
        }
    }

    pub(crate) async fn receive<S>(&self, reader: &mut S) -> LoopExit
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        let session_id = self.session.id();

        loop {
            let message = match reader.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return LoopExit::Disconnected(e.to_string()),
                None => return LoopExit::Disconnected("stream ended".to_string()),
            };

            if let Message::Close(frame) = &message {
                return LoopExit::Disconnected(describe_close(frame.as_ref()));
            }

            let text = match frame_text(message, self.compress) {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "Skipping undecodable frame");
                    continue;
                }
            };

            let signal = match Signal::decode(&text) {
                Ok(Some(signal)) => signal,
                Ok(None) => {
                    tracing::trace!(session_id = %session_id, "Dropping frame without signal code");
                    continue;
                }
                Err(e) => {
                    if let Some(sn) = e.event_sn() {
                        self.session.observe_sn(sn);
                    }
                    tracing::warn!(session_id = %session_id, error = %e, "Skipping malformed frame");
                    continue;
                }
            };

            match signal {
                Signal::Event(event) => self.dispatch(event).await,
                Signal::Pong => {
                    let latency = self.session.record_pong();
                    tracing::trace!(
                        session_id = %session_id,
                        latency_ms = latency.map(|l| l.as_millis()),
                        "Pong received"
                    );
                }
                Signal::Reconnect(payload) => {
                    tracing::warn!(
                        session_id = %session_id,
                        code = payload.code,
                        reason = %payload,
                        "Gateway requested reconnect"
                    );
                    return LoopExit::Reconnect(payload);
                }
                Signal::ResumeAck(ack) => {
                    tracing::info!(session_id = %ack.session_id, "Resume acknowledged");
                }
                other => {
                    tracing::trace!(session_id = %session_id, signal = %other.code(), "Dropping signal");
                }
            }
        }
    }

    async fn dispatch(&self, event: EventSignal) {
        let sn = event.sn;
        let previous = self.session.observe_sn(sn);
        if sn < previous {
            tracing::debug!(
                session_id = %self.session.id(),
                sn,
                max_sn = previous,
                "Skipping stale event"
            );
            return;
        }

        tracing::trace!(
            session_id = %self.session.id(),
            sn,
            event_type = %event.shell.event_type,
            "Event received"
        );

        if self.chain.is_empty() {
            return;
        }

        let signal = Arc::new(event);
        let parser = self
            .registry
            .resolve(signal.shell.event_type, signal.sub_type.as_ref())
            .clone();
        if parser.is_fallback() {
            tracing::debug!(
                sn,
                event_type = %signal.shell.event_type,
                sub_type = ?signal.sub_type,
                "No decoder registered, delivering as unsupported"
            );
        }
        let lazy = Arc::new(LazyEvent::new(signal.clone(), parser));

        self.chain.run_pre_processors(&signal, &lazy);

        if !self.chain.has_processors() {
            return;
        }
        let processors = self.chain.processors();
        let run = ProcessorChain::run_processors(processors, signal, lazy);
        if self.event_process_async {
            tokio::spawn(run);
        } else {
            run.await;
        }
    }
}
