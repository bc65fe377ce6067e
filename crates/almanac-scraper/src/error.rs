use almanac_core::records::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    #[error("request to {url} failed with HTTP status {status}")]
    RequestFailed { status: u16, url: String },

    #[error("failed to parse content from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("API request failed for {target}: {message}")]
    Api { target: String, message: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ScrapeError {
    /// Classification carried on the `ErrorRecord` for this failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::RateLimited { .. } => ErrorKind::RateLimited,
            ScrapeError::Http(_) | ScrapeError::RequestFailed { .. } | ScrapeError::Api { .. } => {
                ErrorKind::RequestFailed
            }
            ScrapeError::Parse { .. } => ErrorKind::Parsing,
            ScrapeError::InvalidUrl { .. } => ErrorKind::Other,
        }
    }

    /// Returns `true` if `self` represents a transient condition worth
    /// retrying after a backoff delay.
    ///
    /// Retryable: 429 rate limits, non-2xx responses, and network-level
    /// failures (DNS, connection refused, timeout). Not retryable: parse
    /// failures, API-level rejections, and malformed URLs — repeating the
    /// request would return the same result.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::RateLimited { .. }
                | ScrapeError::RequestFailed { .. }
                | ScrapeError::Http(_)
        )
    }
}
