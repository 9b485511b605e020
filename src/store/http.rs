//! HTTP campaign store.
//!
//! Thin JSON wrapper over a REST-style campaigns endpoint:
//! `POST /campaigns`, `PUT /campaigns/{id}`, `GET /campaigns/{id}`.
//! Response parsing is kept in pure functions for testability.

use std::time::Duration;

use super::{CampaignStore, StoreError};
use crate::document::CanonicalDocument;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreConfigError {
    #[error("missing store URL: env var {var} not set")]
    MissingUrl { var: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl StoreConfig {
    /// Build store config from environment variables.
    ///
    /// Required:
    /// - `CAMPAIGN_STORE_URL`
    ///
    /// Optional:
    /// - `CAMPAIGN_STORE_TOKEN`: bearer token
    /// - `CAMPAIGN_STORE_TIMEOUT_SECS`: default 30
    /// - `CAMPAIGN_STORE_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if `CAMPAIGN_STORE_URL` is missing.
    pub fn from_env() -> Result<Self, StoreConfigError> {
        let base_url = std::env::var("CAMPAIGN_STORE_URL")
            .map_err(|_| StoreConfigError::MissingUrl { var: "CAMPAIGN_STORE_URL".into() })?
            .trim_end_matches('/')
            .to_string();
        let token = std::env::var("CAMPAIGN_STORE_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        Ok(Self {
            base_url,
            token,
            request_timeout_secs: crate::config::env_parse("CAMPAIGN_STORE_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout_secs: crate::config::env_parse(
                "CAMPAIGN_STORE_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            ),
        })
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpStore {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStore {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| StoreError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url, token: config.token })
    }

    fn collection_url(&self) -> String {
        format!("{}/campaigns", self.base_url)
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/campaigns/{id}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(u16, String), StoreError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Ok((status, text))
    }
}

#[async_trait::async_trait]
impl CampaignStore for HttpStore {
    async fn create(&self, document: &CanonicalDocument) -> Result<CanonicalDocument, StoreError> {
        let (status, body) = self
            .send(self.http.post(self.collection_url()).json(document))
            .await?;
        parse_saved(status, &body)
    }

    async fn update(&self, id: &str, document: &CanonicalDocument) -> Result<CanonicalDocument, StoreError> {
        let (status, body) = self
            .send(self.http.put(self.document_url(id)).json(document))
            .await?;
        if status == 404 {
            return Err(StoreError::NotFound(id.to_owned()));
        }
        parse_saved(status, &body)
    }

    async fn read(&self, id: &str) -> Result<Option<CanonicalDocument>, StoreError> {
        let (status, body) = self.send(self.http.get(self.document_url(id))).await?;
        if status == 404 {
            return Ok(None);
        }
        parse_saved(status, &body).map(Some)
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse a write/read response. Accepts either the bare document or a
/// `{ "data": document }` envelope.
fn parse_saved(status: u16, body: &str) -> Result<CanonicalDocument, StoreError> {
    if !(200..300).contains(&status) {
        return Err(StoreError::Response { status, body: body.to_owned() });
    }

    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| StoreError::Parse(e.to_string()))?;
    let document = match value {
        serde_json::Value::Object(mut map) if map.get("data").is_some_and(serde_json::Value::is_object) => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    };
    serde_json::from_value(document).map_err(|e| StoreError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
