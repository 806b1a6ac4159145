//! Compute-once event decoding
//!
//! The typed payload of an event is decoded the first time a processor asks
//! for it and shared by every later reader.

use super::{EventPayload, EventSignal, RegisteredParser};
use crate::error::ProtocolDecodeError;
use std::sync::{Arc, OnceLock};

/// Lazily decoded event payload
pub struct LazyEvent {
    signal: Arc<EventSignal>,
    parser: RegisteredParser,
    decoded: OnceLock<Result<EventPayload, ProtocolDecodeError>>,
}

impl LazyEvent {
    #[must_use]
    pub fn new(signal: Arc<EventSignal>, parser: RegisteredParser) -> Self {
        Self {
            signal,
            parser,
            decoded: OnceLock::new(),
        }
    }

    /// Decode on first call, return the cached result afterwards
    pub fn get(&self) -> Result<&EventPayload, &ProtocolDecodeError> {
        self.decoded
            .get_or_init(|| self.parser.decode(&self.signal))
            .as_ref()
    }

    /// Check if the payload has been decoded yet
    #[must_use]
    pub fn is_decoded(&self) -> bool {
        self.decoded.get().is_some()
    }

    /// Check if no registered decoder matched this event
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        self.parser.is_fallback()
    }

    #[must_use]
    pub fn signal(&self) -> &EventSignal {
        &self.signal
    }
}

impl std::fmt::Debug for LazyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyEvent")
            .field("sn", &self.signal.sn)
            .field("parser", &self.parser)
            .field("decoded", &self.is_decoded())
            .finish()
    }
}
