//! Client for the upstream raw-data service.
//!
//! Fetches one user's day of per-slot records from
//! `GET <base_url>/api/mood/raw/day?user_id=<id>&date=<YYYY-MM-DD>`.

use crate::collector::spool::{parse_day_value, validate_user_id, DayBatch, RawDataSource};
use crate::config::UpstreamSettings;
use crate::error::MoodError;
use chrono::NaiveDate;
use std::time::Duration;

/// Upstream client error types.
#[derive(Debug)]
pub enum UpstreamError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// Response body could not be decoded
    Serialization(String),
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamError::Config(msg) => write!(f, "Upstream config error: {msg}"),
            UpstreamError::Network(msg) => write!(f, "Upstream network error: {msg}"),
            UpstreamError::Server { status, message } => {
                write!(f, "Upstream server error ({status}): {message}")
            }
            UpstreamError::Serialization(msg) => write!(f, "Upstream serialization error: {msg}"),
        }
    }
}

impl std::error::Error for UpstreamError {}

impl From<UpstreamError> for MoodError {
    fn from(err: UpstreamError) -> Self {
        MoodError::Upstream(err.to_string())
    }
}

impl UpstreamSettings {
    /// Endpoint serving one day of raw records.
    pub fn day_url(&self) -> String {
        format!("{}/api/mood/raw/day", self.base_url.trim_end_matches('/'))
    }
}

/// Async client for the upstream raw-data service.
pub struct UpstreamClient {
    settings: UpstreamSettings,
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(settings: UpstreamSettings) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(|e| UpstreamError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &UpstreamSettings {
        &self.settings
    }

    /// Fetch and decode one day; malformed rows are skipped and counted.
    pub async fn fetch_day(&self, user_id: &str, date: NaiveDate) -> Result<DayBatch, MoodError> {
        validate_user_id(user_id)?;
        let date_param = date.format("%Y-%m-%d").to_string();

        let mut request = self
            .client
            .get(self.settings.day_url())
            .query(&[("user_id", user_id), ("date", date_param.as_str())]);
        if let Some(token) = &self.settings.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(user_id, %date, error = %e, "Upstream request failed");
            UpstreamError::Network(e.to_string())
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MoodError::Input(format!(
                "no raw data for user {user_id} on {date}"
            )));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(user_id, %date, status = status.as_u16(), "Upstream returned an error");
            return Err(UpstreamError::Server {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::Serialization(e.to_string()))?;

        parse_day_value(body)
    }
}

/// Blocking upstream client for use in synchronous contexts.
pub struct BlockingUpstreamClient {
    inner: UpstreamClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingUpstreamClient {
    pub fn new(settings: UpstreamSettings) -> Result<Self, UpstreamError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| UpstreamError::Config(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: UpstreamClient::new(settings)?,
            runtime,
        })
    }
}

impl RawDataSource for BlockingUpstreamClient {
    fn fetch_day(&self, user_id: &str, date: NaiveDate) -> Result<DayBatch, MoodError> {
        self.runtime.block_on(self.inner.fetch_day(user_id, date))
    }
}
