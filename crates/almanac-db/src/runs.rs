//! Database operations for the `scraper_runs` log.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `scraper_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunLogRow {
    pub id: i64,
    /// `"stock"` or `"weather"`.
    pub run_type: String,
    /// Upstream identifier, e.g. `"yahoo_finance"` or `"openweathermap"`.
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// `true` when the run's error list was empty.
    pub success: bool,
    /// Raw records fetched, before validation.
    pub records_scraped: i32,
    pub error_message: Option<String>,
}

/// Outcome of one pipeline run, to be logged.
#[derive(Debug, Clone)]
pub struct NewRunLog {
    pub run_type: String,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub success: bool,
    pub records_scraped: i32,
    pub error_message: Option<String>,
}

/// Appends a run outcome to the log. `completed_at` is stamped by the
/// database.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn log_run(pool: &PgPool, run: &NewRunLog) -> Result<RunLogRow, DbError> {
    let row = sqlx::query_as::<_, RunLogRow>(
        "INSERT INTO scraper_runs \
             (run_type, source, started_at, completed_at, success, records_scraped, error_message) \
         VALUES ($1, $2, $3, NOW(), $4, $5, $6) \
         RETURNING id, run_type, source, started_at, completed_at, success, \
                   records_scraped, error_message",
    )
    .bind(&run.run_type)
    .bind(&run.source)
    .bind(run.started_at)
    .bind(run.success)
    .bind(run.records_scraped)
    .bind(&run.error_message)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
