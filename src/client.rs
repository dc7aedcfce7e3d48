//! HTTP client for the HK Airport flight information API.

use crate::types::Direction;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Past flight movements endpoint of the HK Airport open API.
pub const DEFAULT_BASE_URL: &str =
    "https://www.hongkongairport.com/flightinfo-rest/rest/flights/past";

/// The feed keeps roughly this many trailing days of movements.
pub const LOOKBACK_DAYS: i64 = 90;

/// True when `date` is older than the feed's trailing window as of
/// `today`. Such requests usually come back empty.
pub fn outside_lookback(date: NaiveDate, today: NaiveDate) -> bool {
    (today - date).num_days() > LOOKBACK_DAYS
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Server returned error status: {status}")]
    ServerError { status: StatusCode },
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },
}

/// Configuration for the API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint URL, overridable for tests and mirrors.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Transient-failure retries per fetch.
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further attempt.
    pub retry_delay: Duration,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_delay: Duration::from_secs(2),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for fetching past flight movements.
///
/// Honors `HTTP_PROXY`/`HTTPS_PROXY` through reqwest's system proxy
/// support.
pub struct HkAirportClient {
    client: Client,
    config: ClientConfig,
}

impl HkAirportClient {
    /// Create a new API client.
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("flyghts-audit/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch the raw response body for one (date, direction, cargo) batch,
    /// retrying failures with a doubling delay. A rate-limit response that
    /// names its own retry-after wins over the configured delay.
    pub async fn fetch_day_raw(
        &self,
        date: NaiveDate,
        direction: Direction,
        cargo: bool,
    ) -> Result<String, FetchError> {
        if outside_lookback(date, chrono::Local::now().date_naive()) {
            tracing::warn!(
                %date,
                "Date is older than the feed's ~{LOOKBACK_DAYS}-day window; expect empty data"
            );
        }

        let mut delay = self.config.retry_delay;
        let mut attempt = 0;
        loop {
            match self.fetch_once(date, direction, cargo).await {
                Ok(body) => return Ok(body),
                Err(err) if attempt < self.config.max_retries => {
                    let wait = match &err {
                        FetchError::RateLimited {
                            retry_after: Some(after),
                        } => *after,
                        _ => delay,
                    };
                    attempt += 1;
                    tracing::warn!(
                        %date,
                        %direction,
                        attempt,
                        error = %err,
                        "Fetch failed, retrying in {:?}",
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    delay *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_once(
        &self,
        date: NaiveDate,
        direction: Direction,
        cargo: bool,
    ) -> Result<String, FetchError> {
        tracing::debug!(%date, %direction, cargo, "Fetching: {}", self.config.base_url);

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&query_params(date, direction, cargo))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.text().await?),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);

                Err(FetchError::RateLimited { retry_after })
            }
            status => Err(FetchError::ServerError { status }),
        }
    }
}

fn query_params(date: NaiveDate, direction: Direction, cargo: bool) -> [(&'static str, String); 4] {
    [
        ("date", date.format("%Y-%m-%d").to_string()),
        ("arrival", direction.is_arrival().to_string()),
        ("cargo", cargo.to_string()),
        ("lang", "en".to_string()),
    ]
}
