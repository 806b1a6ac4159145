//! Application error types
//!
//! Top-level error for binaries embedding the gateway client.

use crate::config::ConfigError;
use std::fmt;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Gateway errors (handshake, resolution, closed client)
    #[error("Gateway error: {0}")]
    Gateway(String),

    // HTTP client setup errors
    #[error("HTTP error: {0}")]
    Http(String),
}

impl AppError {
    /// Get a stable error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::Http(_) => "HTTP_ERROR",
        }
    }

    /// Create a gateway error from anything displayable
    #[must_use]
    pub fn gateway(err: impl fmt::Display) -> Self {
        Self::Gateway(err.to_string())
    }
}

/// Result type alias using `AppError`
pub type AppResult<T> = Result<T, AppError>;
