//! Event types
//!
//! Shell, typed payloads, the decoder registry and compute-once decoding.

mod event_types;
mod lazy;
mod payloads;
mod registry;

pub use event_types::{system_tags, ChannelType, EventType, EventTypeKey, SubTypeKey};
pub use lazy::LazyEvent;
pub use payloads::{
    decode_message, decode_system, decode_unsupported, Author, EventPayload, EventShell,
    EventSignal, MessageEvent, MessageExtra, SystemEvent, SystemExtra, UnsupportedEvent,
};
pub use registry::{DecodeFn, EventRegistry, EventRegistryBuilder, RegisteredParser};
