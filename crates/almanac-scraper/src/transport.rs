//! HTTP transport with jittered throttling, timeout, and typed failure
//! classification.
//!
//! The client owns no record of prior calls: no caching, no rate-limit
//! memory across targets. A fresh [`ScrapeClient`] is scoped to one run by
//! the caller.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use reqwest::Client;

use crate::error::ScrapeError;
use crate::retry::retry_with_backoff;

/// Default Retry-After when the header is absent or non-numeric, in seconds.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Transport knobs, usually derived from `AppConfig`.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Jitter bounds: a uniform random sleep in `[min, max]` milliseconds
    /// precedes every attempt. Set both to 0 to disable.
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Total attempts per fetch, including the first. Values below 1 are
    /// treated as 1.
    pub max_attempts: u32,
}

impl From<&almanac_core::AppConfig> for ScrapeSettings {
    fn from(config: &almanac_core::AppConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            user_agent: config.user_agent.clone(),
            min_delay_ms: config.min_delay_ms,
            max_delay_ms: config.max_delay_ms,
            max_attempts: config.max_attempts,
        }
    }
}

/// HTTP client for outbound scraping requests.
///
/// Classifies responses into typed errors: 429 becomes
/// [`ScrapeError::RateLimited`] (with the server's Retry-After hint), any
/// other non-2xx becomes [`ScrapeError::RequestFailed`], and network-level
/// failures surface as [`ScrapeError::Http`]. All three are retried with
/// exponential backoff up to `max_attempts` total tries.
pub struct ScrapeClient {
    client: Client,
    min_delay_ms: u64,
    max_delay_ms: u64,
    max_attempts: u32,
}

impl ScrapeClient {
    /// Creates a `ScrapeClient` with configured timeout, `User-Agent`, and
    /// retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(settings: &ScrapeSettings) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&settings.user_agent)
            .build()?;
        Ok(Self {
            client,
            min_delay_ms: settings.min_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            max_attempts: settings.max_attempts,
        })
    }

    /// Fetches `url` and returns the response body as text, with automatic
    /// retry on transient errors.
    ///
    /// `query` pairs are appended to the URL; `headers` override the
    /// client-level defaults for this request only.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::InvalidUrl`] — `url` does not parse (not retried).
    /// - [`ScrapeError::RateLimited`] — HTTP 429 after all attempts exhausted.
    /// - [`ScrapeError::RequestFailed`] — any other non-2xx status after all
    ///   attempts exhausted.
    /// - [`ScrapeError::Http`] — network or TLS failure after all attempts
    ///   exhausted.
    pub async fn fetch_text(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &BTreeMap<String, String>,
    ) -> Result<String, ScrapeError> {
        // Malformed URLs are programming/configuration errors; fail before
        // any delay or attempt.
        let parsed = reqwest::Url::parse(url).map_err(|e| ScrapeError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        retry_with_backoff(self.max_attempts, || {
            let parsed = parsed.clone();
            async move {
                self.throttle().await;

                let mut request = self.client.get(parsed.clone());
                if !query.is_empty() {
                    request = request.query(query);
                }
                for (name, value) in headers {
                    request = request.header(name.as_str(), value.as_str());
                }

                let response = request.send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

                    tracing::warn!(url = %parsed, retry_after_secs, "rate limited");
                    return Err(ScrapeError::RateLimited {
                        url: parsed.to_string(),
                        retry_after_secs,
                    });
                }

                if !status.is_success() {
                    return Err(ScrapeError::RequestFailed {
                        status: status.as_u16(),
                        url: parsed.to_string(),
                    });
                }

                Ok(response.text().await?)
            }
        })
        .await
    }

    /// Fetches `url` and parses the response body as JSON.
    ///
    /// # Errors
    ///
    /// Everything [`fetch_text`](Self::fetch_text) returns, plus
    /// [`ScrapeError::Parse`] when the body is not valid JSON (not retried).
    pub async fn fetch_json(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<serde_json::Value, ScrapeError> {
        let body = self.fetch_text(url, query, &BTreeMap::new()).await?;
        serde_json::from_str(&body).map_err(|e| ScrapeError::Parse {
            url: url.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Uniform random sleep before a request, to avoid a detectable
    /// fixed-interval pattern.
    async fn throttle(&self) {
        if self.max_delay_ms == 0 {
            return;
        }
        let delay_ms = rand::rng().random_range(self.min_delay_ms..=self.max_delay_ms);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}
