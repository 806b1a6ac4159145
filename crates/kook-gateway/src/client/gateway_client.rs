//! Gateway client
//!
//! Owns the current session, serializes every (re)connect behind one lock and
//! routes received events to the processor chains.

use super::receive::{EventLoop, LoopExit};
use super::state::{ClientState, StateCell};
use super::ClientConfig;
use crate::connection::{self, Connected, Session};
use crate::error::{GatewayError, GatewayResult, ProcessorError};
use crate::events::{EventRegistry, EventSignal, LazyEvent};
use crate::processors::ProcessorChain;
use crate::protocol::ReconnectPayload;
use crate::resolver::{GatewayResolver, ResumeParams};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{watch, Mutex};

/// What led to a (re)connect
pub(crate) enum StartCause {
    /// `start()` called by the application
    Initial,
    /// Server sent Reconnect; start a fresh session
    ReconnectSignal {
        previous: Weak<Session>,
        payload: ReconnectPayload,
    },
    /// Transport dropped mid-session; try to resume it
    Disconnected {
        previous: Weak<Session>,
        resume: ResumeParams,
        reason: String,
    },
}

impl StartCause {
    fn previous(&self) -> Option<&Weak<Session>> {
        match self {
            Self::Initial => None,
            Self::ReconnectSignal { previous, .. } | Self::Disconnected { previous, .. } => {
                Some(previous)
            }
        }
    }

    fn resume(&self) -> Option<&ResumeParams> {
        match self {
            Self::Disconnected { resume, .. } => Some(resume),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Initial => "initial start".to_string(),
            Self::ReconnectSignal { payload, .. } => format!("reconnect signal: {payload}"),
            Self::Disconnected { reason, .. } => format!("disconnected: {reason}"),
        }
    }
}

pub(crate) struct ClientInner {
    config: ClientConfig,
    resolver: Arc<dyn GatewayResolver>,
    registry: Arc<EventRegistry>,
    chain: Arc<ProcessorChain>,

    /// Serializes start, reconnect and cancel
    start_lock: Mutex<()>,

    session: RwLock<Option<Arc<Session>>>,
    state: StateCell,

    /// Flips true on the first successful start
    started: AtomicBool,

    /// Set as soon as cancel begins
    closing: AtomicBool,

    /// Set once cancel has torn everything down
    closed: watch::Sender<bool>,
}

impl ClientInner {
    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    fn current_session(&self) -> Option<Arc<Session>> {
        self.session.read().clone()
    }

    async fn start_with(self: Arc<Self>, cause: StartCause) -> GatewayResult<bool> {
        let _guard = self.start_lock.lock().await;
        if self.is_closing() {
            return Err(GatewayError::Closed);
        }

        let previous = self.current_session();
        if let Some(expected) = cause.previous() {
            let still_current = previous
                .as_ref()
                .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), expected.as_ptr()));
            if !still_current {
                tracing::debug!(
                    client = %self.config.name,
                    cause = %cause.describe(),
                    "Session already replaced, skipping reconnect"
                );
                return Ok(false);
            }
        }

        if let Some(previous) = previous {
            self.state.set(ClientState::Reconnecting);
            *self.session.write() = None;
            previous.cancel();
            tracing::info!(
                client = %self.config.name,
                session_id = %previous.id(),
                cause = %cause.describe(),
                "Previous session torn down"
            );
        }

        self.state.set(ClientState::Connecting);
        match self.connect(cause.resume()).await {
            Ok(session) => {
                self.started.store(true, Ordering::SeqCst);
                self.state.set(ClientState::Active);
                tracing::info!(
                    client = %self.config.name,
                    session_id = %session.id(),
                    resumed = cause.resume().is_some(),
                    "Gateway client active"
                );
                Ok(true)
            }
            Err(e) => {
                self.state.set(ClientState::Idle);
                tracing::error!(
                    client = %self.config.name,
                    cause = %cause.describe(),
                    error = %e,
                    "Gateway connect failed"
                );
                Err(e)
            }
        }
    }

    async fn connect(self: &Arc<Self>, resume: Option<&ResumeParams>) -> GatewayResult<Arc<Session>> {
        let mut url = self.resolver.resolve(self.config.compress).await?;
        if let Some(resume) = resume {
            url = resume.apply(&url)?;
        }

        self.state.set(ClientState::Handshaking);
        let Connected { session, reader } =
            connection::connect(&url, self.config.handshake_options()).await?;

        if self.is_closing() {
            session.cancel();
            return Err(GatewayError::Closed);
        }

        let event_loop = EventLoop {
            client: Arc::downgrade(self),
            session: session.clone(),
            registry: self.registry.clone(),
            chain: self.chain.clone(),
            compress: self.config.compress,
            event_process_async: self.config.event_process_async,
        };
        session.attach_receiver(tokio::spawn(event_loop.run(reader)));
        *self.session.write() = Some(session.clone());

        Ok(session)
    }

    /// Called by a receive loop when its session ends
    pub(crate) fn on_loop_exit(self: Arc<Self>, session: &Arc<Session>, exit: LoopExit) {
        if self.is_closing() || session.is_cancelled() {
            return;
        }
        let previous = Arc::downgrade(session);

        match exit {
            LoopExit::Reconnect(payload) => {
                spawn_restart(self, StartCause::ReconnectSignal { previous, payload });
            }
            LoopExit::Disconnected(reason) if self.config.reconnect_on_disconnect => {
                tracing::warn!(
                    client = %self.config.name,
                    session_id = %session.id(),
                    reason = %reason,
                    "Gateway connection lost, attempting to resume"
                );
                let resume = ResumeParams {
                    session_id: session.id().to_string(),
                    sn: session.current_sn(),
                };
                spawn_restart(
                    self,
                    StartCause::Disconnected {
                        previous,
                        resume,
                        reason,
                    },
                );
            }
            LoopExit::Disconnected(reason) => {
                tracing::warn!(
                    client = %self.config.name,
                    session_id = %session.id(),
                    reason = %reason,
                    "Gateway connection lost"
                );
                spawn_teardown(self, previous);
            }
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.cancel();
        }
    }
}

// Boxed so the reconnect future does not name the receive loop's future type
fn spawn_restart(inner: Arc<ClientInner>, cause: StartCause) {
    let task: BoxFuture<'static, ()> = Box::pin(async move {
        let name = inner.config.name.clone();
        match inner.start_with(cause).await {
            Ok(_) | Err(GatewayError::Closed) => {}
            Err(e) => {
                tracing::error!(
                    client = %name,
                    error = %e,
                    "Reconnect failed, client is idle until start() is called again"
                );
            }
        }
    });
    tokio::spawn(task);
}

fn spawn_teardown(inner: Arc<ClientInner>, previous: Weak<Session>) {
    tokio::spawn(async move {
        let _guard = inner.start_lock.lock().await;
        let removed = {
            let mut slot = inner.session.write();
            let is_current = slot
                .as_ref()
                .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), previous.as_ptr()));
            if is_current {
                slot.take()
            } else {
                None
            }
        };
        if let Some(session) = removed {
            session.cancel();
            inner.state.set(ClientState::Idle);
        }
    });
}

/// Gateway client handle
///
/// Cheap to clone; every clone drives the same connection.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<ClientInner>,
}

impl GatewayClient {
    /// Create an idle client
    #[must_use]
    pub fn new(
        config: ClientConfig,
        resolver: Arc<dyn GatewayResolver>,
        registry: Arc<EventRegistry>,
    ) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            inner: Arc::new(ClientInner {
                config,
                resolver,
                registry,
                chain: Arc::new(ProcessorChain::new()),
                start_lock: Mutex::new(()),
                session: RwLock::new(None),
                state: StateCell::new(ClientState::Idle),
                started: AtomicBool::new(false),
                closing: AtomicBool::new(false),
                closed,
            }),
        }
    }

    /// Connect, replacing any current session
    ///
    /// Returns `Ok(true)` once the new session is active.
    pub async fn start(&self) -> GatewayResult<bool> {
        self.inner.clone().start_with(StartCause::Initial).await
    }

    /// Wait until the client is cancelled
    pub async fn join(&self) {
        let mut closed = self.inner.closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Cancel the client and its session; irreversible
    pub async fn cancel(&self, reason: Option<&str>) {
        if self.inner.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(
            client = %self.inner.config.name,
            reason = reason.unwrap_or("none"),
            "Cancelling gateway client"
        );

        let _guard = self.inner.start_lock.lock().await;
        let session = self.inner.session.write().take();
        if let Some(session) = session {
            session.cancel();
        }
        self.inner.state.close();
        self.inner.closed.send_replace(true);
    }

    /// Append a synchronous pre-processor
    pub fn register_pre_processor<F>(&self, pre_processor: F)
    where
        F: Fn(&EventSignal, &LazyEvent) -> Result<(), ProcessorError> + Send + Sync + 'static,
    {
        self.inner.chain.register_pre_processor(pre_processor);
    }

    /// Append an asynchronous processor
    pub fn register_processor<F, Fut>(&self, processor: F)
    where
        F: Fn(Arc<EventSignal>, Arc<LazyEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ProcessorError>> + Send + 'static,
    {
        self.inner.chain.register_processor(processor);
    }

    /// Highest `sn` seen by the current session, 0 without one
    #[must_use]
    pub fn current_sequence_number(&self) -> u64 {
        self.inner
            .current_session()
            .map_or(0, |session| session.current_sn())
    }

    /// Check if a start has ever succeeded
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Check if the client has not been cancelled
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.inner.is_closing()
    }

    /// Check if a live session exists
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ClientState::Active
            && self
                .inner
                .current_session()
                .is_some_and(|session| !session.is_cancelled())
    }

    #[must_use]
    pub fn state(&self) -> ClientState {
        self.inner.state.get()
    }

    /// Handle to the current session
    #[must_use]
    pub fn session(&self) -> Option<Arc<Session>> {
        self.inner.current_session()
    }

    /// Id of the current session
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.inner
            .current_session()
            .map(|session| session.id().to_string())
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn registry(&self) -> &EventRegistry {
        &self.inner.registry
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("name", &self.inner.config.name)
            .field("state", &self.state())
            .field("session_id", &self.session_id())
            .field("chain", &self.inner.chain)
            .finish()
    }
}
