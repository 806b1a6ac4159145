//! Gateway signal codes
//!
//! The `s` discriminator carried by every signal envelope.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Gateway signal codes
///
/// Every frame exchanged with the gateway is an envelope `{"s": .., "d": .., "sn": ..}`
/// whose `s` field selects one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SignalCode {
    /// Event dispatch, carries `sn` (server only)
    Event = 0,
    /// Handshake result (server only)
    Hello = 1,
    /// Heartbeat carrying the highest seen `sn` (client only)
    Ping = 2,
    /// Heartbeat acknowledgement (server only)
    Pong = 3,
    /// Resume request carrying the highest seen `sn` (client only)
    Resume = 4,
    /// Server asks the client to reconnect from scratch (server only)
    Reconnect = 5,
    /// Resume accepted (server only)
    ResumeAck = 6,
}

impl SignalCode {
    /// Create a `SignalCode` from a raw integer value
    #[must_use]
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Event),
            1 => Some(Self::Hello),
            2 => Some(Self::Ping),
            3 => Some(Self::Pong),
            4 => Some(Self::Resume),
            5 => Some(Self::Reconnect),
            6 => Some(Self::ResumeAck),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this signal is sent by the client
    #[must_use]
    pub const fn is_client_signal(self) -> bool {
        matches!(self, Self::Ping | Self::Resume)
    }

    /// Check if this signal is sent by the server
    #[must_use]
    pub const fn is_server_signal(self) -> bool {
        !self.is_client_signal()
    }

    /// Get the name of this signal code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Event => "Event",
            Self::Hello => "Hello",
            Self::Ping => "Ping",
            Self::Pong => "Pong",
            Self::Resume => "Resume",
            Self::Reconnect => "Reconnect",
            Self::ResumeAck => "ResumeAck",
        }
    }
}

impl Serialize for SignalCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for SignalCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Self::from_i64(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid signal code: {value}")))
    }
}

impl std::fmt::Display for SignalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}
