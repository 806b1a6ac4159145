//! Connection management
//!
//! Session lifecycle, handshake, heartbeat and the outbound writer.

mod handshake;
mod heartbeat;
mod session;
mod writer;

pub use handshake::{accept_hello, connect, wait_for_hello, Connected, HandshakeOptions, WsReader, WsStream};
pub use heartbeat::{next_interval, HeartbeatConfig};
pub use session::Session;
