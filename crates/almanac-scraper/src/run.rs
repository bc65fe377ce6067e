//! Per-run aggregation: raw records and target-level failures.

use chrono::{DateTime, Utc};
use serde::Serialize;

use almanac_core::records::{ErrorKind, RawRecord};

use crate::error::ScrapeError;

/// A target-level failure. Never propagated further: collected into the
/// run's error list while the remaining targets proceed.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub target: String,
    pub kind: ErrorKind,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    #[must_use]
    pub fn new(target: impl Into<String>, err: &ScrapeError) -> Self {
        Self {
            target: target.into(),
            kind: err.kind(),
            message: err.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

/// Terminal output of one pipeline invocation.
///
/// Invariant: every target produced exactly one entry, so
/// `records.len() + errors.len()` equals the configured target count.
#[derive(Debug, Default)]
pub struct RunResult {
    pub records: Vec<RawRecord>,
    pub errors: Vec<ErrorRecord>,
}

impl RunResult {
    /// Count of raw (fetched, not necessarily validated) records.
    #[must_use]
    pub fn records_scraped(&self) -> usize {
        self.records.len()
    }

    /// A run is successful when no target failed. A run with zero records
    /// and nonzero errors is degraded but not fatal.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn target_count(&self) -> usize {
        self.records.len() + self.errors.len()
    }

    /// Human-readable digest of the error list for the run log, or `None`
    /// for a clean run.
    #[must_use]
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}: {}", e.target, e.kind, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Some(joined)
    }
}
