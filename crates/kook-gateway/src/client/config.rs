//! Client configuration

use crate::connection::{HandshakeOptions, HeartbeatConfig};
use kook_common::GatewaySettings;
use std::time::Duration;

/// Runtime options of a [`GatewayClient`](super::GatewayClient)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Name used in log fields
    pub name: String,
    /// Request zlib-compressed frames
    pub compress: bool,
    /// Bound on connect plus wait-for-Hello
    pub connect_timeout: Duration,
    pub heartbeat: HeartbeatConfig,
    /// Run processors on a spawned task per event instead of inline
    pub event_process_async: bool,
    /// Attempt one resuming reconnect after an unexpected disconnect
    pub reconnect_on_disconnect: bool,
}

impl ClientConfig {
    pub(crate) fn handshake_options(&self) -> HandshakeOptions {
        HandshakeOptions {
            connect_timeout: self.connect_timeout,
            compress: self.compress,
            heartbeat: self.heartbeat,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "kook-gateway".to_string(),
            compress: true,
            connect_timeout: Duration::from_secs(6),
            heartbeat: HeartbeatConfig::default(),
            event_process_async: true,
            reconnect_on_disconnect: true,
        }
    }
}

impl From<&GatewaySettings> for ClientConfig {
    fn from(settings: &GatewaySettings) -> Self {
        Self {
            name: "kook-gateway".to_string(),
            compress: settings.compress,
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            heartbeat: HeartbeatConfig {
                interval: Duration::from_millis(settings.heartbeat_interval_ms),
                jitter: Duration::from_millis(settings.heartbeat_jitter_ms),
                pong_timeout: Duration::from_millis(settings.pong_timeout_ms),
            },
            event_process_async: settings.event_process_async,
            reconnect_on_disconnect: settings.reconnect_on_disconnect,
        }
    }
}
