//! Gateway client
//!
//! Lifecycle, reconnect policy and the per-session receive loop.

mod config;
mod gateway_client;
mod receive;
mod state;

pub use config::ClientConfig;
pub use gateway_client::GatewayClient;
pub use state::ClientState;
