//! Gateway URL resolution
//!
//! The client asks a [`GatewayResolver`] for a fresh WebSocket URL before
//! every connection attempt.

use crate::error::ResolveError;
use async_trait::async_trait;
use kook_common::GatewaySettings;
use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

/// Source of gateway WebSocket URLs
#[async_trait]
pub trait GatewayResolver: Send + Sync {
    /// Resolve the URL to connect to
    async fn resolve(&self, compress: bool) -> Result<String, ResolveError>;
}

/// Resolver that always returns the same URL
#[derive(Debug, Clone)]
pub struct StaticGatewayResolver {
    url: String,
}

impl StaticGatewayResolver {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl GatewayResolver for StaticGatewayResolver {
    async fn resolve(&self, _compress: bool) -> Result<String, ResolveError> {
        Ok(self.url.clone())
    }
}

/// Resolver backed by `GET {api_base_url}/gateway/index`
#[derive(Debug, Clone)]
pub struct HttpGatewayResolver {
    client: reqwest::Client,
    api_base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct GatewayIndexResponse {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<GatewayIndexData>,
}

#[derive(Debug, Deserialize)]
struct GatewayIndexData {
    url: String,
}

impl HttpGatewayResolver {
    /// Build a resolver from gateway settings
    pub fn new(settings: &GatewaySettings) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.http_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        })
    }

    fn index_url(&self) -> String {
        format!("{}/gateway/index", self.api_base_url)
    }
}

#[async_trait]
impl GatewayResolver for HttpGatewayResolver {
    async fn resolve(&self, compress: bool) -> Result<String, ResolveError> {
        let response: GatewayIndexResponse = self
            .client
            .get(self.index_url())
            .query(&[("compress", if compress { "1" } else { "0" })])
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response {
            GatewayIndexResponse {
                code: 0,
                data: Some(data),
                ..
            } => {
                tracing::debug!(url = %data.url, "Resolved gateway URL");
                Ok(data.url)
            }
            GatewayIndexResponse { code, message, .. } => {
                tracing::error!(code, message = %message, "Gateway lookup rejected");
                Err(ResolveError::Api { code, message })
            }
        }
    }
}

/// Previous session a reconnect asks to continue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeParams {
    pub session_id: String,
    pub sn: u64,
}

impl ResumeParams {
    /// Append `resume=1`, `session_id` and `sn` to a gateway URL
    pub fn apply(&self, url: &str) -> Result<String, ResolveError> {
        let mut parsed = Url::parse(url).map_err(|e| ResolveError::InvalidUrl(format!("{url}: {e}")))?;
        parsed
            .query_pairs_mut()
            .append_pair("resume", "1")
            .append_pair("session_id", &self.session_id)
            .append_pair("sn", &self.sn.to_string());
        Ok(parsed.into())
    }
}
