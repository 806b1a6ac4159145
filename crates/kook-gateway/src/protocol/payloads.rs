//! Server payload definitions
//!
//! Defines the `d` payloads of the non-event server signals.

use super::{HelloCode, ReconnectCode};
use serde::{Deserialize, Serialize};

/// Payload for s=1 (Hello)
///
/// Sent by the server right after the connection opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// 0 on success, otherwise a failure code
    pub code: i64,

    /// Session identifier, present on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl HelloPayload {
    /// Successful Hello for the given session
    #[must_use]
    pub fn success(session_id: impl Into<String>) -> Self {
        Self {
            code: 0,
            session_id: Some(session_id.into()),
        }
    }

    /// Failed Hello with the given code
    #[must_use]
    pub fn failure(code: i64) -> Self {
        Self {
            code,
            session_id: None,
        }
    }

    /// Typed result code
    #[must_use]
    pub const fn result(&self) -> HelloCode {
        HelloCode::from_i64(self.code)
    }
}

/// Payload for s=5 (Reconnect)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPayload {
    /// Reason code
    pub code: i64,

    /// Human readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl ReconnectPayload {
    /// Typed reason code
    #[must_use]
    pub const fn reason(&self) -> ReconnectCode {
        ReconnectCode::from_i64(self.code)
    }
}

impl std::fmt::Display for ReconnectPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.err {
            Some(err) => write!(f, "{} ({err})", self.reason()),
            None => write!(f, "{}", self.reason()),
        }
    }
}

/// Payload for s=6 (ResumeAck)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeAckPayload {
    #[serde(default)]
    pub session_id: String,
}
