//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: GatewaySettings,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Gateway connection settings
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// REST base URL used to resolve the gateway address
    pub api_base_url: String,
    /// Bot token (sent as `Authorization: Bot <token>`)
    pub token: String,
    /// Request zlib-compressed frames from the gateway
    pub compress: bool,
    /// Bound on connect + wait-for-Hello, in milliseconds
    pub connect_timeout_ms: u64,
    /// Base heartbeat interval in milliseconds
    pub heartbeat_interval_ms: u64,
    /// Maximum jitter applied to the heartbeat interval, in either direction
    pub heartbeat_jitter_ms: u64,
    /// Expected Pong latency; only observed, never enforced
    pub pong_timeout_ms: u64,
    /// Run processors on a spawned task per event
    pub event_process_async: bool,
    /// Attempt one resuming reconnect when the connection drops mid-session
    pub reconnect_on_disconnect: bool,
    /// Timeout for the gateway resolution HTTP call, in milliseconds
    pub http_timeout_ms: u64,
}

impl GatewaySettings {
    /// Settings with every optional value at its default
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token: token.into(),
            compress: true,
            connect_timeout_ms: default_connect_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_jitter_ms: default_heartbeat_jitter_ms(),
            pong_timeout_ms: default_pong_timeout_ms(),
            event_process_async: true,
            reconnect_on_disconnect: true,
            http_timeout_ms: default_http_timeout_ms(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "kook-gateway".to_string()
}

fn default_api_base_url() -> String {
    "https://www.kookapp.cn/api/v3".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    6_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_jitter_ms() -> u64 {
    5_000
}

fn default_pong_timeout_ms() -> u64 {
    6_000
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = GatewaySettings::with_token(String::new());

        let config = Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .as_deref()
                    .and_then(Environment::parse)
                    .unwrap_or_default(),
            },
            gateway: GatewaySettings {
                api_base_url: lookup("KOOK_API_BASE_URL").unwrap_or(defaults.api_base_url),
                token: lookup("KOOK_BOT_TOKEN")
                    .filter(|t| !t.trim().is_empty())
                    .ok_or(ConfigError::MissingVar("KOOK_BOT_TOKEN"))?,
                compress: parse_flag(&lookup, "KOOK_COMPRESS", defaults.compress)?,
                connect_timeout_ms: parse_or(
                    &lookup,
                    "KOOK_CONNECT_TIMEOUT_MS",
                    defaults.connect_timeout_ms,
                )?,
                heartbeat_interval_ms: parse_or(
                    &lookup,
                    "KOOK_HEARTBEAT_INTERVAL_MS",
                    defaults.heartbeat_interval_ms,
                )?,
                heartbeat_jitter_ms: parse_or(
                    &lookup,
                    "KOOK_HEARTBEAT_JITTER_MS",
                    defaults.heartbeat_jitter_ms,
                )?,
                pong_timeout_ms: parse_or(&lookup, "KOOK_PONG_TIMEOUT_MS", defaults.pong_timeout_ms)?,
                event_process_async: parse_flag(
                    &lookup,
                    "KOOK_EVENT_PROCESS_ASYNC",
                    defaults.event_process_async,
                )?,
                reconnect_on_disconnect: parse_flag(
                    &lookup,
                    "KOOK_RECONNECT_ON_DISCONNECT",
                    defaults.reconnect_on_disconnect,
                )?,
                http_timeout_ms: parse_or(&lookup, "KOOK_HTTP_TIMEOUT_MS", defaults.http_timeout_ms)?,
            },
        };

        let gateway = &config.gateway;
        if gateway.heartbeat_jitter_ms >= gateway.heartbeat_interval_ms {
            return Err(ConfigError::InvalidValue(
                "KOOK_HEARTBEAT_JITTER_MS",
                format!(
                    "{} (must be below heartbeat interval {})",
                    gateway.heartbeat_jitter_ms, gateway.heartbeat_interval_ms
                ),
            ));
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(name, raw)),
        },
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
