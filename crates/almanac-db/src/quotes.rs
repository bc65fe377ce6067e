//! Database operations for `stock_quotes`.

use almanac_core::StockQuote;
use sqlx::PgPool;

use crate::DbError;

/// Inserts a batch of validated quotes, `batch_size` rows per transaction.
///
/// Returns the number of rows inserted. An empty batch is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; rows from already-committed
/// chunks remain.
pub async fn insert_quotes(
    pool: &PgPool,
    quotes: &[StockQuote],
    batch_size: usize,
) -> Result<usize, DbError> {
    if quotes.is_empty() {
        tracing::warn!("no stock quotes to save");
        return Ok(0);
    }

    let mut inserted = 0usize;

    for chunk in quotes.chunks(batch_size.max(1)) {
        let mut tx = pool.begin().await?;

        for quote in chunk {
            sqlx::query(
                "INSERT INTO stock_quotes \
                     (symbol, price, change, change_percent, volume, scrape_url, captured_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(&quote.symbol)
            .bind(quote.price)
            .bind(quote.change)
            .bind(quote.change_percent)
            .bind(quote.volume)
            .bind(&quote.scrape_url)
            .bind(quote.captured_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        inserted += chunk.len();
    }

    tracing::info!(inserted, "saved stock quotes");
    Ok(inserted)
}
