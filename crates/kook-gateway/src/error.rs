//! Gateway error types

use crate::protocol::HelloCode;
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failure to turn a frame into a signal or typed event
#[derive(Debug, Error)]
pub enum ProtocolDecodeError {
    /// Frame text is not JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Envelope is not a JSON object
    #[error("Signal envelope is not a JSON object")]
    NotAnObject,

    /// `s` names no known signal
    #[error("Unknown signal code: {0}")]
    UnknownSignal(i64),

    /// A field required by the signal kind is absent
    #[error("Missing field `{field}` for signal s={code}")]
    MissingField { code: i64, field: &'static str },

    /// A field is present but does not have the expected shape
    #[error("Invalid `{field}`: {source}")]
    InvalidField {
        field: &'static str,
        source: serde_json::Error,
    },

    /// Binary frame failed to inflate
    #[error("Frame decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    /// Binary frame is not UTF-8 text
    #[error("Frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Event envelope carried an `sn` but its body did not decode
    #[error("Undecodable event sn={sn}: {source}")]
    InvalidEvent {
        sn: u64,
        #[source]
        source: Box<ProtocolDecodeError>,
    },
}

impl ProtocolDecodeError {
    /// `sn` of an event whose body failed to decode
    #[must_use]
    pub fn event_sn(&self) -> Option<u64> {
        match self {
            Self::InvalidEvent { sn, .. } => Some(*sn),
            _ => None,
        }
    }
}

/// Failure to establish a session
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// WebSocket could not be opened
    #[error("Failed to open gateway connection: {0}")]
    Connect(#[source] Box<tungstenite::Error>),

    /// No Hello arrived in time
    #[error("No Hello received within {0:?}")]
    Timeout(Duration),

    /// Transport closed before Hello
    #[error("Gateway closed before Hello: {0}")]
    TransportClosed(String),

    /// Hello carried a failure code
    #[error("Hello rejected: {0}")]
    Rejected(HelloCode),

    /// Hello reported success without a session id
    #[error("Hello succeeded without a session id")]
    MissingSessionId,
}

impl HandshakeError {
    /// The Hello code, if the server answered with one
    #[must_use]
    pub fn hello_code(&self) -> Option<HelloCode> {
        match self {
            Self::Rejected(code) => Some(*code),
            _ => None,
        }
    }
}

/// Failure reported by a pre-processor or processor
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Processor returned an error
    #[error("Processor failed: {0}")]
    Failed(String),

    /// Processor panicked
    #[error("Processor panicked: {0}")]
    Panicked(String),

    /// Typed event could not be decoded
    #[error("Event decode failed: {0}")]
    Decode(String),
}

impl ProcessorError {
    /// Create a failure from anything displayable
    #[must_use]
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }
}

impl From<&ProtocolDecodeError> for ProcessorError {
    fn from(err: &ProtocolDecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Failure to resolve the gateway URL
#[derive(Debug, Error)]
pub enum ResolveError {
    /// HTTP call failed
    #[error("Gateway lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-zero code
    #[error("Gateway lookup returned code {code}: {message}")]
    Api { code: i64, message: String },

    /// URL could not be parsed or extended
    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),
}

/// Error returned by client operations
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Client has been cancelled
    #[error("Gateway client is closed")]
    Closed,
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;
