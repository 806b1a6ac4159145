//! Event type discriminators
//!
//! Outer message type, channel type and the secondary sub-type key.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Outer event type (`d.type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Text,
    Image,
    Video,
    File,
    Voice,
    KMarkdown,
    Card,
    /// Non-message system notification
    System,
    /// Any value not listed above
    Unknown(i64),
}

impl EventType {
    /// Every message type (all known kinds except `System`)
    pub const MESSAGE_TYPES: [Self; 7] = [
        Self::Text,
        Self::Image,
        Self::Video,
        Self::File,
        Self::Voice,
        Self::KMarkdown,
        Self::Card,
    ];

    #[must_use]
    pub const fn from_i64(value: i64) -> Self {
        match value {
            1 => Self::Text,
            2 => Self::Image,
            3 => Self::Video,
            4 => Self::File,
            8 => Self::Voice,
            9 => Self::KMarkdown,
            10 => Self::Card,
            255 => Self::System,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Text => 1,
            Self::Image => 2,
            Self::Video => 3,
            Self::File => 4,
            Self::Voice => 8,
            Self::KMarkdown => 9,
            Self::Card => 10,
            Self::System => 255,
            Self::Unknown(value) => value,
        }
    }

    /// Check if this is a chat message type
    #[must_use]
    pub const fn is_message(self) -> bool {
        !matches!(self, Self::System | Self::Unknown(_))
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Image => "Image",
            Self::Video => "Video",
            Self::File => "File",
            Self::Voice => "Voice",
            Self::KMarkdown => "KMarkdown",
            Self::Card => "Card",
            Self::System => "System",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl Serialize for EventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.as_i64())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(Self::from_i64)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_i64())
    }
}

/// Channel an event belongs to (`d.channel_type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelType {
    Group,
    Person,
    Broadcast,
    #[serde(other)]
    Unknown,
}

/// Secondary discriminator (`d.extra.type`)
///
/// Message events carry the numeric message type again, system events carry
/// a string tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubTypeKey {
    Numeric(i64),
    Tag(String),
}

impl SubTypeKey {
    /// Read a sub-type from a JSON primitive
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Numeric),
            Value::String(s) => Some(Self::Tag(s.clone())),
            _ => None,
        }
    }
}

impl From<i64> for SubTypeKey {
    fn from(value: i64) -> Self {
        Self::Numeric(value)
    }
}

impl From<EventType> for SubTypeKey {
    fn from(value: EventType) -> Self {
        Self::Numeric(value.as_i64())
    }
}

impl From<&str> for SubTypeKey {
    fn from(value: &str) -> Self {
        Self::Tag(value.to_string())
    }
}

impl From<String> for SubTypeKey {
    fn from(value: String) -> Self {
        Self::Tag(value)
    }
}

impl std::fmt::Display for SubTypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Tag(tag) => f.write_str(tag),
        }
    }
}

/// Registry key: outer type plus sub-type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventTypeKey {
    pub outer: EventType,
    pub inner: SubTypeKey,
}

impl EventTypeKey {
    #[must_use]
    pub fn new(outer: EventType, inner: impl Into<SubTypeKey>) -> Self {
        Self {
            outer,
            inner: inner.into(),
        }
    }
}

impl std::fmt::Display for EventTypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.outer.name(), self.inner)
    }
}

/// Tags of the system events the standard registry understands
pub mod system_tags {
    pub const JOINED_GUILD: &str = "joined_guild";
    pub const EXITED_GUILD: &str = "exited_guild";
    pub const UPDATED_GUILD: &str = "updated_guild";
    pub const DELETED_GUILD: &str = "deleted_guild";
    pub const SELF_JOINED_GUILD: &str = "self_joined_guild";
    pub const SELF_EXITED_GUILD: &str = "self_exited_guild";
    pub const ADDED_ROLE: &str = "added_role";
    pub const DELETED_ROLE: &str = "deleted_role";
    pub const UPDATED_ROLE: &str = "updated_role";
    pub const ADDED_CHANNEL: &str = "added_channel";
    pub const UPDATED_CHANNEL: &str = "updated_channel";
    pub const DELETED_CHANNEL: &str = "deleted_channel";
    pub const PINNED_MESSAGE: &str = "pinned_message";
    pub const UNPINNED_MESSAGE: &str = "unpinned_message";
    pub const JOINED_CHANNEL: &str = "joined_channel";
    pub const EXITED_CHANNEL: &str = "exited_channel";
    pub const UPDATED_GUILD_MEMBER: &str = "updated_guild_member";
    pub const GUILD_MEMBER_ONLINE: &str = "guild_member_online";
    pub const GUILD_MEMBER_OFFLINE: &str = "guild_member_offline";
    pub const UPDATED_MESSAGE: &str = "updated_message";
    pub const DELETED_MESSAGE: &str = "deleted_message";
    pub const UPDATED_PRIVATE_MESSAGE: &str = "updated_private_message";
    pub const DELETED_PRIVATE_MESSAGE: &str = "deleted_private_message";
    pub const ADDED_REACTION: &str = "added_reaction";
    pub const DELETED_REACTION: &str = "deleted_reaction";
    pub const PRIVATE_ADDED_REACTION: &str = "private_added_reaction";
    pub const PRIVATE_DELETED_REACTION: &str = "private_deleted_reaction";
    pub const ADDED_BLOCK_LIST: &str = "added_block_list";
    pub const DELETED_BLOCK_LIST: &str = "deleted_block_list";
    pub const MESSAGE_BTN_CLICK: &str = "message_btn_click";
    pub const USER_UPDATED: &str = "user_updated";

    /// Every known tag
    pub const ALL: [&str; 31] = [
        JOINED_GUILD,
        EXITED_GUILD,
        UPDATED_GUILD,
        DELETED_GUILD,
        SELF_JOINED_GUILD,
        SELF_EXITED_GUILD,
        ADDED_ROLE,
        DELETED_ROLE,
        UPDATED_ROLE,
        ADDED_CHANNEL,
        UPDATED_CHANNEL,
        DELETED_CHANNEL,
        PINNED_MESSAGE,
        UNPINNED_MESSAGE,
        JOINED_CHANNEL,
        EXITED_CHANNEL,
        UPDATED_GUILD_MEMBER,
        GUILD_MEMBER_ONLINE,
        GUILD_MEMBER_OFFLINE,
        UPDATED_MESSAGE,
        DELETED_MESSAGE,
        UPDATED_PRIVATE_MESSAGE,
        DELETED_PRIVATE_MESSAGE,
        ADDED_REACTION,
        DELETED_REACTION,
        PRIVATE_ADDED_REACTION,
        PRIVATE_DELETED_REACTION,
        ADDED_BLOCK_LIST,
        DELETED_BLOCK_LIST,
        MESSAGE_BTN_CLICK,
        USER_UPDATED,
    ];
}
