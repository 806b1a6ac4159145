//! Event payload definitions
//!
//! The eagerly decoded event shell and the typed payloads produced by the
//! registry decoders.

use super::{ChannelType, EventType, EventTypeKey, SubTypeKey};
use crate::error::ProtocolDecodeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Common fields of every event, decoded as soon as the frame arrives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventShell {
    pub channel_type: ChannelType,

    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Channel id, user id or guild id depending on the event
    #[serde(deserialize_with = "id_string")]
    pub target_id: String,

    #[serde(deserialize_with = "id_string")]
    pub author_id: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub msg_id: String,

    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub msg_timestamp: i64,

    #[serde(default)]
    pub nonce: String,
}

impl EventShell {
    /// `msg_timestamp` as a UTC timestamp
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.msg_timestamp)
    }
}

/// An Event signal (s=0) with its shell decoded and its `extra` kept raw
#[derive(Debug, Clone, PartialEq)]
pub struct EventSignal {
    /// Server assigned sequence number
    pub sn: u64,
    pub shell: EventShell,
    /// `d.extra.type`, when present
    pub sub_type: Option<SubTypeKey>,
    /// The whole `d` object
    pub raw: Value,
}

impl EventSignal {
    /// Decode the shell of an event payload
    pub fn from_payload(raw: Value, sn: u64) -> Result<Self, ProtocolDecodeError> {
        let shell = EventShell::deserialize(&raw).map_err(|source| {
            ProtocolDecodeError::InvalidField { field: "d", source }
        })?;
        let sub_type = raw
            .get("extra")
            .and_then(|extra| extra.get("type"))
            .and_then(SubTypeKey::from_value);

        Ok(Self {
            sn,
            shell,
            sub_type,
            raw,
        })
    }

    /// Registry key of this event, if it carries a sub-type
    #[must_use]
    pub fn key(&self) -> Option<EventTypeKey> {
        self.sub_type.clone().map(|inner| EventTypeKey {
            outer: self.shell.event_type,
            inner,
        })
    }

    /// The raw `extra` object
    #[must_use]
    pub fn extra(&self) -> Option<&Value> {
        self.raw.get("extra")
    }
}

/// Sender of a message event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub identify_num: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub roles: Vec<i64>,
}

/// `extra` of a message event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageExtra {
    #[serde(rename = "type")]
    pub message_type: i64,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default, deserialize_with = "id_list")]
    pub mention: Vec<String>,
    #[serde(default)]
    pub mention_all: bool,
    #[serde(default, deserialize_with = "id_list")]
    pub mention_roles: Vec<String>,
    #[serde(default)]
    pub mention_here: bool,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub kmarkdown: Option<Value>,
    #[serde(default)]
    pub attachments: Option<Value>,
}

/// `extra` of a system event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemExtra {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub shell: EventShell,
    pub extra: MessageExtra,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemEvent {
    pub shell: EventShell,
    pub extra: SystemExtra,
}

impl SystemEvent {
    /// Deserialize the body into a caller supplied type
    pub fn body_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.extra.body)
    }
}

/// An event no registered decoder understands
#[derive(Debug, Clone, PartialEq)]
pub struct UnsupportedEvent {
    pub key: Option<EventTypeKey>,
    pub raw: Value,
}

/// Typed result of decoding an event
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Message(MessageEvent),
    System(SystemEvent),
    Unsupported(UnsupportedEvent),
}

impl EventPayload {
    #[must_use]
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Self::Message(event) => Some(event),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_system(&self) -> Option<&SystemEvent> {
        match self {
            Self::System(event) => Some(event),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// Decode `extra` of a message event
pub fn decode_message(signal: &EventSignal) -> Result<EventPayload, ProtocolDecodeError> {
    let extra = decode_extra::<MessageExtra>(signal)?;
    Ok(EventPayload::Message(MessageEvent {
        shell: signal.shell.clone(),
        extra,
    }))
}

/// Decode `extra` of a system event
pub fn decode_system(signal: &EventSignal) -> Result<EventPayload, ProtocolDecodeError> {
    let extra = decode_extra::<SystemExtra>(signal)?;
    Ok(EventPayload::System(SystemEvent {
        shell: signal.shell.clone(),
        extra,
    }))
}

/// Wrap the raw payload without decoding it
pub fn decode_unsupported(signal: &EventSignal) -> Result<EventPayload, ProtocolDecodeError> {
    Ok(EventPayload::Unsupported(UnsupportedEvent {
        key: signal.key(),
        raw: signal.raw.clone(),
    }))
}

fn decode_extra<T: serde::de::DeserializeOwned>(
    signal: &EventSignal,
) -> Result<T, ProtocolDecodeError> {
    let extra = signal.extra().unwrap_or(&Value::Null);
    T::deserialize(extra).map_err(|source| ProtocolDecodeError::InvalidField {
        field: "extra",
        source,
    })
}

// Ids arrive as strings, but some payloads send them as numbers
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!("expected id, got {other}"))),
    }
}

fn id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    values
        .into_iter()
        .map(|value| match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!("expected id, got {other}"))),
        })
        .collect()
}
