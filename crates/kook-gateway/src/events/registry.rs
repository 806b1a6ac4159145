//! Event registry
//!
//! Maps (outer type, sub-type) to a typed decoder. Built once through
//! [`EventRegistryBuilder`] and shared read-only afterwards.

use super::payloads::{decode_message, decode_system, decode_unsupported};
use super::{system_tags, EventPayload, EventSignal, EventType, EventTypeKey, SubTypeKey};
use crate::error::ProtocolDecodeError;
use std::collections::HashMap;
use std::sync::Arc;

/// Decoder turning an event signal into a typed payload
pub type DecodeFn = dyn Fn(&EventSignal) -> Result<EventPayload, ProtocolDecodeError> + Send + Sync;

/// A decoder bound to one key, or the wildcard fallback
#[derive(Clone)]
pub struct RegisteredParser {
    /// `None` for the wildcard fallback
    key: Option<EventTypeKey>,
    decoder: Arc<DecodeFn>,
}

impl RegisteredParser {
    fn new(key: Option<EventTypeKey>, decoder: Arc<DecodeFn>) -> Self {
        Self { key, decoder }
    }

    #[must_use]
    pub fn key(&self) -> Option<&EventTypeKey> {
        self.key.as_ref()
    }

    /// Check if this parser handles the given type pair
    #[must_use]
    pub fn check(&self, outer: EventType, inner: &SubTypeKey) -> bool {
        match &self.key {
            Some(key) => key.outer == outer && &key.inner == inner,
            None => true,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.key.is_none()
    }

    /// Run the decoder
    pub fn decode(&self, signal: &EventSignal) -> Result<EventPayload, ProtocolDecodeError> {
        (self.decoder)(signal)
    }
}

impl std::fmt::Debug for RegisteredParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredParser")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Immutable lookup table of event decoders
#[derive(Debug)]
pub struct EventRegistry {
    parsers: HashMap<EventTypeKey, RegisteredParser>,
    fallback: RegisteredParser,
}

impl EventRegistry {
    /// Start an empty registry
    #[must_use]
    pub fn builder() -> EventRegistryBuilder {
        EventRegistryBuilder::default()
    }

    /// Registry with every message type and known system tag
    #[must_use]
    pub fn standard() -> Self {
        let mut builder = Self::builder();
        for kind in EventType::MESSAGE_TYPES {
            builder = builder.register_message(kind);
        }
        for tag in system_tags::ALL {
            builder = builder.register_system(tag);
        }
        builder.build()
    }

    /// Exact lookup; `None` when nothing is registered for the pair
    #[must_use]
    pub fn lookup(&self, outer: EventType, inner: &SubTypeKey) -> Option<&RegisteredParser> {
        self.parsers
            .get(&EventTypeKey {
                outer,
                inner: inner.clone(),
            })
            .filter(|parser| parser.check(outer, inner))
    }

    /// Lookup that falls back to the unsupported decoder
    #[must_use]
    pub fn resolve(&self, outer: EventType, inner: Option<&SubTypeKey>) -> &RegisteredParser {
        inner
            .and_then(|inner| self.lookup(outer, inner))
            .unwrap_or(&self.fallback)
    }

    #[must_use]
    pub fn contains(&self, key: &EventTypeKey) -> bool {
        self.parsers.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Builder for [`EventRegistry`]
#[derive(Default)]
pub struct EventRegistryBuilder {
    parsers: HashMap<EventTypeKey, RegisteredParser>,
    fallback: Option<Arc<DecodeFn>>,
}

impl EventRegistryBuilder {
    /// Register a decoder; a later registration for the same key replaces the earlier one
    pub fn register<F>(mut self, outer: EventType, inner: impl Into<SubTypeKey>, decoder: F) -> Self
    where
        F: Fn(&EventSignal) -> Result<EventPayload, ProtocolDecodeError> + Send + Sync + 'static,
    {
        let key = EventTypeKey::new(outer, inner);
        let parser = RegisteredParser::new(Some(key.clone()), Arc::new(decoder));
        self.parsers.insert(key, parser);
        self
    }

    /// Register the message decoder for a message type
    pub fn register_message(self, kind: EventType) -> Self {
        self.register(kind, kind, decode_message)
    }

    /// Register the system decoder for a system tag
    pub fn register_system(self, tag: &str) -> Self {
        self.register(EventType::System, tag, decode_system)
    }

    /// Replace the unsupported fallback decoder
    pub fn fallback<F>(mut self, decoder: F) -> Self
    where
        F: Fn(&EventSignal) -> Result<EventPayload, ProtocolDecodeError> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(decoder));
        self
    }

    #[must_use]
    pub fn build(self) -> EventRegistry {
        let fallback: Arc<DecodeFn> = match self.fallback {
            Some(decoder) => decoder,
            None => Arc::new(decode_unsupported),
        };
        EventRegistry {
            parsers: self.parsers,
            fallback: RegisteredParser::new(None, fallback),
        }
    }
}
