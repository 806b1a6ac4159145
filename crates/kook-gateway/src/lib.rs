//! # kook-gateway
//!
//! WebSocket client for the KOOK real-time event gateway.
//!
//! A [`GatewayClient`] resolves the gateway URL, completes the Hello
//! handshake, keeps the session alive with heartbeats and feeds every event
//! through the registered pre-processors and processors. Event bodies are
//! decoded lazily, at most once, through the [`EventRegistry`].

pub mod client;
pub mod connection;
pub mod error;
pub mod events;
pub mod processors;
pub mod protocol;
pub mod resolver;

pub use client::{ClientConfig, ClientState, GatewayClient};
pub use error::{GatewayError, GatewayResult, HandshakeError, ProcessorError, ProtocolDecodeError, ResolveError};
pub use events::{EventPayload, EventRegistry, EventSignal, LazyEvent};
pub use resolver::{GatewayResolver, HttpGatewayResolver, ResumeParams, StaticGatewayResolver};
