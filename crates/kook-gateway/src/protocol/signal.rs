//! Signal envelope codec
//!
//! Decodes `{"s": .., "d": .., "sn": ..}` envelopes into [`Signal`] and
//! encodes the two client signals.

use super::{HelloPayload, ReconnectPayload, ResumeAckPayload, SignalCode};
use crate::error::ProtocolDecodeError;
use crate::events::EventSignal;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// One decoded gateway signal
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// s=0
    Event(EventSignal),
    /// s=1
    Hello(HelloPayload),
    /// s=2
    Ping { sn: u64 },
    /// s=3
    Pong,
    /// s=4
    Resume { sn: u64 },
    /// s=5
    Reconnect(ReconnectPayload),
    /// s=6
    ResumeAck(ResumeAckPayload),
}

impl Signal {
    /// Decode a text frame
    ///
    /// Returns `Ok(None)` when the envelope has no integer `s`.
    pub fn decode(text: &str) -> Result<Option<Self>, ProtocolDecodeError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decode an already parsed envelope
    pub fn from_value(value: Value) -> Result<Option<Self>, ProtocolDecodeError> {
        let Value::Object(mut envelope) = value else {
            return Err(ProtocolDecodeError::NotAnObject);
        };

        let Some(code) = envelope.get("s").and_then(Value::as_i64) else {
            return Ok(None);
        };
        let kind = SignalCode::from_i64(code).ok_or(ProtocolDecodeError::UnknownSignal(code))?;

        let signal = match kind {
            SignalCode::Event => {
                let sn = require_sn(&envelope, code)?;
                take_data(&mut envelope, code)
                    .and_then(|data| EventSignal::from_payload(data, sn))
                    .map(Self::Event)
                    .map_err(|source| ProtocolDecodeError::InvalidEvent {
                        sn,
                        source: Box::new(source),
                    })?
            }
            SignalCode::Hello => Self::Hello(decode_data(&mut envelope, code)?),
            SignalCode::Ping => Self::Ping {
                sn: require_sn(&envelope, code)?,
            },
            SignalCode::Pong => Self::Pong,
            SignalCode::Resume => Self::Resume {
                sn: require_sn(&envelope, code)?,
            },
            SignalCode::Reconnect => Self::Reconnect(decode_data(&mut envelope, code)?),
            SignalCode::ResumeAck => Self::ResumeAck(decode_data(&mut envelope, code)?),
        };

        Ok(Some(signal))
    }

    /// Signal code of this signal
    #[must_use]
    pub const fn code(&self) -> SignalCode {
        match self {
            Self::Event(_) => SignalCode::Event,
            Self::Hello(_) => SignalCode::Hello,
            Self::Ping { .. } => SignalCode::Ping,
            Self::Pong => SignalCode::Pong,
            Self::Resume { .. } => SignalCode::Resume,
            Self::Reconnect(_) => SignalCode::Reconnect,
            Self::ResumeAck(_) => SignalCode::ResumeAck,
        }
    }

    /// Encode a client signal; server signals are never sent and yield `None`
    #[must_use]
    pub fn encode(&self) -> Option<String> {
        match self {
            Self::Ping { sn } => Some(ping_frame(*sn)),
            Self::Resume { sn } => Some(resume_frame(*sn)),
            _ => None,
        }
    }
}

/// Ping frame text, exactly `{"s":2,"sn":N}`
#[must_use]
pub fn ping_frame(sn: u64) -> String {
    format!(r#"{{"s":2,"sn":{sn}}}"#)
}

/// Resume frame text, exactly `{"s":4,"sn":N}`
#[must_use]
pub fn resume_frame(sn: u64) -> String {
    format!(r#"{{"s":4,"sn":{sn}}}"#)
}

fn require_sn(envelope: &Map<String, Value>, code: i64) -> Result<u64, ProtocolDecodeError> {
    envelope
        .get("sn")
        .and_then(Value::as_u64)
        .ok_or(ProtocolDecodeError::MissingField { code, field: "sn" })
}

fn take_data(envelope: &mut Map<String, Value>, code: i64) -> Result<Value, ProtocolDecodeError> {
    match envelope.remove("d") {
        Some(Value::Null) | None => Err(ProtocolDecodeError::MissingField { code, field: "d" }),
        Some(data) => Ok(data),
    }
}

fn decode_data<T: DeserializeOwned>(
    envelope: &mut Map<String, Value>,
    code: i64,
) -> Result<T, ProtocolDecodeError> {
    let data = take_data(envelope, code)?;
    serde_json::from_value(data)
        .map_err(|source| ProtocolDecodeError::InvalidField { field: "d", source })
}
