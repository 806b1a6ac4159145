//! Test helpers for integration tests
//!
//! Provides an in-process mock gateway that plays a script per connection,
//! a mock `gateway/index` endpoint and a client factory.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use kook_gateway::connection::HeartbeatConfig;
use kook_gateway::{ClientConfig, EventRegistry, GatewayClient, StaticGatewayResolver};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// One scripted server action
#[derive(Debug, Clone)]
pub enum Step {
    /// Send a frame
    Send(Message),
    /// Pause before the next step
    Sleep(Duration),
    /// Close the connection from the server side
    Close,
}

/// Steps played on one accepted connection
///
/// A script that does not end in [`Step::Close`] keeps the connection open,
/// recording client frames until the client goes away.
pub type Script = Vec<Step>;

/// Build a script that sends each frame in order
pub fn send_all(frames: impl IntoIterator<Item = Message>) -> Script {
    frames.into_iter().map(Step::Send).collect()
}

#[derive(Default)]
struct Recorded {
    connections: AtomicUsize,
    client_closes: AtomicUsize,
    request_uris: Mutex<Vec<String>>,
    client_frames: Mutex<Vec<(usize, String)>>,
}

/// Mock gateway server
pub struct MockGateway {
    pub addr: SocketAddr,
    recorded: Arc<Recorded>,
    _handle: JoinHandle<()>,
}

impl MockGateway {
    /// Start a gateway that plays `scripts[n]` on the n-th connection
    ///
    /// Connections past the end of `scripts` replay the last script.
    pub async fn start(scripts: Vec<Script>) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let recorded = Arc::new(Recorded::default());
        let scripts = Arc::new(scripts);

        let state = recorded.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let index = state.connections.fetch_add(1, Ordering::SeqCst);
                let script = scripts
                    .get(index)
                    .or_else(|| scripts.last())
                    .cloned()
                    .unwrap_or_default();
                tokio::spawn(serve_connection(stream, index, script, state.clone()));
            }
        });

        Ok(Self {
            addr,
            recorded,
            _handle: handle,
        })
    }

    /// WebSocket URL of the gateway
    pub fn url(&self) -> String {
        format!("ws://{}/gateway?compress=0", self.addr)
    }

    /// Number of accepted TCP connections
    pub fn connections(&self) -> usize {
        self.recorded.connections.load(Ordering::SeqCst)
    }

    /// Number of connections the client closed
    pub fn client_closes(&self) -> usize {
        self.recorded.client_closes.load(Ordering::SeqCst)
    }

    /// Request URI of every completed WebSocket upgrade, in order
    pub fn request_uris(&self) -> Vec<String> {
        self.recorded.request_uris.lock().clone()
    }

    /// Text frames sent by the client
    pub fn client_frames(&self) -> Vec<String> {
        self.recorded
            .client_frames
            .lock()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Text frames sent by the client on the `index`-th connection
    pub fn client_frames_on(&self, index: usize) -> Vec<String> {
        self.recorded
            .client_frames
            .lock()
            .iter()
            .filter(|(connection, _)| *connection == index)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

async fn serve_connection(stream: TcpStream, index: usize, script: Script, recorded: Arc<Recorded>) {
    let uris = recorded.clone();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        uris.request_uris.lock().push(request.uri().to_string());
        Ok(response)
    };
    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };

    for step in script {
        match step {
            Step::Send(message) => {
                if ws.send(message).await.is_err() {
                    return;
                }
            }
            Step::Sleep(duration) => tokio::time::sleep(duration).await,
            Step::Close => {
                let _ = ws.close(None).await;
                return;
            }
        }
    }

    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => recorded.client_frames.lock().push((index, text)),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
    recorded.client_closes.fetch_add(1, Ordering::SeqCst);
}

/// Mock REST API serving `GET /api/v3/gateway/index`
pub struct MockApi {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<(Option<String>, Option<String>)>>>,
    _handle: JoinHandle<()>,
}

#[derive(Clone)]
struct ApiState {
    response: Value,
    requests: Arc<Mutex<Vec<(Option<String>, Option<String>)>>>,
}

async fn gateway_index(
    State(state): State<ApiState>,
    Query(query): Query<std::collections::HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state
        .requests
        .lock()
        .push((authorization, query.get("compress").cloned()));
    Json(state.response.clone())
}

impl MockApi {
    /// Serve a fixed `gateway/index` response body
    pub async fn start(response: Value) -> Result<Self> {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/api/v3/gateway/index", get(gateway_index))
            .with_state(ApiState {
                response,
                requests: requests.clone(),
            });

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            requests,
            _handle: handle,
        })
    }

    /// Serve a successful lookup pointing at `url`
    pub async fn pointing_at(url: &str) -> Result<Self> {
        Self::start(json!({"code": 0, "message": "操作成功", "data": {"url": url}})).await
    }

    /// Base URL to put in `GatewaySettings::api_base_url`
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v3", self.addr)
    }

    /// `(Authorization, compress)` of every request received
    pub fn requests(&self) -> Vec<(Option<String>, Option<String>)> {
        self.requests.lock().clone()
    }
}

/// Client config tuned for tests: no compression, no heartbeat, inline dispatch
pub fn test_config() -> ClientConfig {
    ClientConfig {
        name: "integration".to_string(),
        compress: false,
        connect_timeout: Duration::from_secs(2),
        heartbeat: HeartbeatConfig {
            interval: Duration::from_secs(3600),
            jitter: Duration::ZERO,
            pong_timeout: Duration::from_secs(6),
        },
        event_process_async: false,
        reconnect_on_disconnect: true,
    }
}

/// Client pointed at the mock gateway with the standard registry
pub fn test_client(gateway: &MockGateway, config: ClientConfig) -> GatewayClient {
    test_client_with_registry(gateway, config, EventRegistry::standard())
}

pub fn test_client_with_registry(
    gateway: &MockGateway,
    config: ClientConfig,
    registry: EventRegistry,
) -> GatewayClient {
    GatewayClient::new(
        config,
        Arc::new(StaticGatewayResolver::new(gateway.url())),
        Arc::new(registry),
    )
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Await `future`, failing after two seconds
pub async fn within<F: Future>(future: F) -> Result<F::Output> {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .map_err(|_| anyhow::anyhow!("timed out"))
}
