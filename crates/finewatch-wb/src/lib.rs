//! HTTP client for the marketplace fines API.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use finewatch_monitor::{FetchError, FineSource};
use finewatch_types::FinesResponse;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const MOCK_BASE_URL: &str = "http://localhost:8000";
pub const PROD_BASE_URL: &str = "https://suppliers-api.wildberries.ru";

/// Values shipped in sample `.env` files that must never be sent upstream.
const PLACEHOLDER_KEYS: &[&str] = &["your-api-key", "change-me"];

const PROBE_TIMEOUT_MOCK: Duration = Duration::from_secs(5);
const PROBE_TIMEOUT_PROD: Duration = Duration::from_secs(10);

/// Which upstream the client talks to. The mock server and the real API
/// take different query parameters and expose different health endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMode {
    Mock,
    Prod,
}

#[derive(Debug, Error)]
#[error("unknown API mode {0:?}, expected MOCK or PROD")]
pub struct UnknownMode(String);

impl FromStr for ApiMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MOCK" => Ok(ApiMode::Mock),
            "PROD" => Ok(ApiMode::Prod),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

impl ApiMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMode::Mock => "MOCK",
            ApiMode::Prod => "PROD",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ApiMode::Mock => MOCK_BASE_URL,
            ApiMode::Prod => PROD_BASE_URL,
        }
    }
}

pub struct WbClient {
    client: reqwest::Client,
    base_url: String,
    mode: ApiMode,
    api_key: Option<String>,
    timeout: Duration,
}

impl WbClient {
    /// `base_url` should have no trailing path, e.g. `http://localhost:8000`.
    pub fn new(
        mode: ApiMode,
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        info!(mode = mode.as_str(), url = %base_url, "Fines API client ready");

        Ok(Self {
            client,
            base_url,
            mode,
            api_key: api_key.and_then(usable_api_key),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header(reqwest::header::AUTHORIZATION, key),
            None => req,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl FineSource for WbClient {
    async fn fetch_records(&self, since: Duration) -> Result<Vec<Value>, FetchError> {
        let url = format!("{}/api/v3/fines", self.base_url);
        let req = match self.mode {
            ApiMode::Mock => self.client.get(&url).query(&[("days", lookback_days(since))]),
            ApiMode::Prod => {
                let since = chrono::Duration::from_std(since).unwrap_or(chrono::Duration::days(1));
                let date_from = (Utc::now() - since).to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
                self.client.get(&url).query(&[("dateFrom", date_from)])
            }
        };

        let resp = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_send_error(e))?;
        if !status.is_success() {
            let body: String = body.chars().take(100).collect();
            error!(status = status.as_u16(), body = %body, "Fines API returned an error");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Entries stay untyped here; each one is validated on its own
        let parsed: FinesResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        info!(count = parsed.data.len(), "Fines received");
        if let Some(first) = parsed.data.first() {
            debug!(kind = ?first.get("type"), amount = ?first.get("amount"), "Sample fine");
        }
        Ok(parsed.data)
    }

    async fn test_connection(&self) -> bool {
        let (path, timeout) = match self.mode {
            ApiMode::Mock => ("/health", PROBE_TIMEOUT_MOCK),
            ApiMode::Prod => ("/api/v1/info", PROBE_TIMEOUT_PROD),
        };
        let req = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .timeout(timeout);

        match self.authorized(req).send().await {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(e) => {
                warn!(error = %e, "Connectivity probe failed");
                false
            }
        }
    }
}

/// Whole days covering `since`, at least one.
fn lookback_days(since: Duration) -> String {
    let days = since.as_secs().div_ceil(86_400).max(1);
    days.to_string()
}

/// Drop keys that are empty, still a placeholder, or not valid in a header.
fn usable_api_key(key: &str) -> Option<String> {
    let key = key.trim();
    if key.is_empty() || PLACEHOLDER_KEYS.contains(&key) {
        return None;
    }
    if !key.is_ascii() {
        warn!("API key contains non-ASCII characters, not using it");
        return None;
    }
    Some(key.to_string())
}
