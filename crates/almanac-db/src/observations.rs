//! Database operations for `weather_observations`.

use almanac_core::WeatherObservation;
use sqlx::PgPool;

use crate::DbError;

/// Inserts a batch of validated observations, `batch_size` rows per
/// transaction.
///
/// Returns the number of rows inserted. An empty batch is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; rows from already-committed
/// chunks remain.
pub async fn insert_observations(
    pool: &PgPool,
    observations: &[WeatherObservation],
    batch_size: usize,
) -> Result<usize, DbError> {
    if observations.is_empty() {
        tracing::warn!("no weather observations to save");
        return Ok(0);
    }

    let mut inserted = 0usize;

    for chunk in observations.chunks(batch_size.max(1)) {
        let mut tx = pool.begin().await?;

        for obs in chunk {
            sqlx::query(
                "INSERT INTO weather_observations \
                     (city_name, city_id, temperature, feels_like, humidity, pressure, \
                      wind_speed, wind_direction, cloudiness, weather_condition, \
                      weather_description, weather_icon, rain_1h, snow_1h, \
                      sunrise, sunset, timezone_offset, captured_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, \
                         $7, $8, $9, $10, \
                         $11, $12, $13, $14, \
                         $15, $16, $17, $18)",
            )
            .bind(&obs.city_name)
            .bind(obs.city_id)
            .bind(obs.temperature)
            .bind(obs.feels_like)
            .bind(obs.humidity)
            .bind(obs.pressure)
            .bind(obs.wind_speed)
            .bind(obs.wind_direction)
            .bind(obs.cloudiness)
            .bind(&obs.weather_condition)
            .bind(&obs.weather_description)
            .bind(&obs.weather_icon)
            .bind(obs.rain_1h)
            .bind(obs.snow_1h)
            .bind(obs.sunrise)
            .bind(obs.sunset)
            .bind(obs.timezone_offset)
            .bind(obs.captured_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        inserted += chunk.len();
    }

    tracing::info!(inserted, "saved weather observations");
    Ok(inserted)
}
