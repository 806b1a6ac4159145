//! Session handshake
//!
//! Opens the socket, waits for Hello and turns an accepted Hello into a
//! [`Session`].

use super::heartbeat::HeartbeatConfig;
use super::session::Session;
use crate::error::HandshakeError;
use crate::protocol::{describe_close, frame_text, HelloPayload, Signal};
use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Client socket type
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Read half of the client socket
pub type WsReader = futures_util::stream::SplitStream<WsStream>;

/// Handshake parameters
#[derive(Debug, Clone, Copy)]
pub struct HandshakeOptions {
    /// Bound on connect plus wait-for-Hello
    pub connect_timeout: Duration,
    /// Binary frames are zlib streams
    pub compress: bool,
    pub heartbeat: HeartbeatConfig,
}

/// An accepted session and the read half of its socket
pub struct Connected {
    pub session: Arc<Session>,
    pub reader: WsReader,
}

/// Connect to `url` and complete the Hello exchange
///
/// The connection is dropped (and so aborted) when the timeout elapses or
/// Hello is rejected. Never retries.
pub async fn connect(url: &str, options: HandshakeOptions) -> Result<Connected, HandshakeError> {
    tracing::debug!(url = %url, "Opening gateway connection");

    let exchange = async {
        let (mut stream, _response) = connect_async(url)
            .await
            .map_err(|e| HandshakeError::Connect(Box::new(e)))?;
        let hello = wait_for_hello(&mut stream, options.compress).await?;
        Ok::<_, HandshakeError>((stream, hello))
    };

    let (stream, hello) = tokio::time::timeout(options.connect_timeout, exchange)
        .await
        .map_err(|_| HandshakeError::Timeout(options.connect_timeout))??;

    let session_id = accept_hello(&hello)?;
    let (sink, reader) = stream.split();
    let session = Session::establish(session_id, url.to_string(), sink, options.heartbeat);

    tracing::info!(session_id = %session.id(), "Gateway session established");

    Ok(Connected { session, reader })
}

/// Read frames until one decodes as Hello
///
/// Other signals and undecodable frames before Hello are skipped.
pub async fn wait_for_hello<S>(stream: &mut S, compress: bool) -> Result<HelloPayload, HandshakeError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let message = frame.map_err(|e| HandshakeError::TransportClosed(e.to_string()))?;
        if let Message::Close(close) = &message {
            return Err(HandshakeError::TransportClosed(describe_close(close.as_ref())));
        }

        let text = match frame_text(message, compress) {
            Ok(Some(text)) => text,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable frame before Hello");
                continue;
            }
        };

        match Signal::decode(&text) {
            Ok(Some(Signal::Hello(hello))) => return Ok(hello),
            Ok(Some(other)) => {
                tracing::trace!(signal = %other.code(), "Ignoring signal before Hello");
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping malformed frame before Hello"),
        }
    }

    Err(HandshakeError::TransportClosed(
        "stream ended before Hello".to_string(),
    ))
}

/// Validate a Hello and extract its session id
pub fn accept_hello(hello: &HelloPayload) -> Result<String, HandshakeError> {
    let code = hello.result();
    if !code.is_success() {
        tracing::error!(code = hello.code, reason = code.description(), "Hello rejected");
        return Err(HandshakeError::Rejected(code));
    }

    hello
        .session_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or(HandshakeError::MissingSessionId)
}
