//! One-shot collection: scrape → validate → persist → log the run.

use chrono::Utc;
use sqlx::PgPool;

use almanac_core::{
    validate_observations, validate_quotes, AppConfig, SourcesFile, StockConfig, WeatherConfig,
};
use almanac_db::NewRunLog;
use almanac_scraper::{RunResult, ScrapeClient, ScrapeSettings, StockSource, WeatherSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selection {
    Stocks,
    Weather,
    All,
}

impl Selection {
    fn wants_stocks(self) -> bool {
        matches!(self, Selection::Stocks | Selection::All)
    }

    fn wants_weather(self) -> bool {
        matches!(self, Selection::Weather | Selection::All)
    }
}

/// Entry point for `almanac collect`.
pub(crate) async fn run(
    config: &AppConfig,
    sources: &SourcesFile,
    selection: Selection,
    dry_run: bool,
) -> anyhow::Result<()> {
    let pool = if dry_run {
        tracing::info!("dry run: records will not be persisted");
        None
    } else {
        let pool = almanac_db::connect_pool(&config.database_url, config.into()).await?;
        almanac_db::ping(&pool).await?;
        Some(pool)
    };

    if selection.wants_stocks() {
        match &sources.stocks {
            Some(stocks) => run_stocks(config, stocks, pool.as_ref()).await?,
            None if selection == Selection::Stocks => {
                anyhow::bail!("sources file does not configure 'stocks'")
            }
            None => tracing::info!("no 'stocks' source configured; skipping"),
        }
    }

    if selection.wants_weather() {
        match &sources.weather {
            Some(weather) => run_weather(config, weather, pool.as_ref()).await?,
            None if selection == Selection::Weather => {
                anyhow::bail!("sources file does not configure 'weather'")
            }
            None => tracing::info!("no 'weather' source configured; skipping"),
        }
    }

    Ok(())
}

/// One full stock pipeline run. A fresh HTTP client is scoped to this run
/// and dropped at its end.
pub(crate) async fn run_stocks(
    config: &AppConfig,
    stocks: &StockConfig,
    pool: Option<&PgPool>,
) -> anyhow::Result<()> {
    tracing::info!("starting stock collection run");
    let source = StockSource::new(stocks)?;
    let client = ScrapeClient::new(&ScrapeSettings::from(config))?;

    let started_at = Utc::now();
    let result = source.scrape(&client).await;
    log_outcome("stock", &result);

    let validated = validate_quotes(&result.records);

    if let Some(pool) = pool {
        almanac_db::log_run(
            pool,
            &NewRunLog {
                run_type: "stock".to_owned(),
                source: "yahoo_finance".to_owned(),
                started_at,
                success: result.is_success(),
                records_scraped: i32::try_from(result.records_scraped()).unwrap_or(i32::MAX),
                error_message: result.error_summary(),
            },
        )
        .await?;

        let saved = almanac_db::insert_quotes(pool, &validated, config.db_batch_size).await?;
        tracing::info!(saved, "completed stock collection run");
    } else {
        for quote in validated.iter().take(3) {
            tracing::info!(
                symbol = %quote.symbol,
                price = quote.price,
                change = quote.change,
                "sample quote"
            );
        }
        tracing::info!(
            accepted = validated.len(),
            "completed stock collection run (not persisted)"
        );
    }

    Ok(())
}

/// One full weather pipeline run. A fresh HTTP client is scoped to this run
/// and dropped at its end.
pub(crate) async fn run_weather(
    config: &AppConfig,
    weather: &WeatherConfig,
    pool: Option<&PgPool>,
) -> anyhow::Result<()> {
    tracing::info!("starting weather collection run");
    let source = WeatherSource::new(weather, config.weather_api_key.as_deref())?;
    let client = ScrapeClient::new(&ScrapeSettings::from(config))?;

    let started_at = Utc::now();
    let result = source.scrape(&client).await;
    log_outcome("weather", &result);

    let validated = validate_observations(&result.records);

    if let Some(pool) = pool {
        almanac_db::log_run(
            pool,
            &NewRunLog {
                run_type: "weather".to_owned(),
                source: "openweathermap".to_owned(),
                started_at,
                success: result.is_success(),
                records_scraped: i32::try_from(result.records_scraped()).unwrap_or(i32::MAX),
                error_message: result.error_summary(),
            },
        )
        .await?;

        let saved =
            almanac_db::insert_observations(pool, &validated, config.db_batch_size).await?;
        tracing::info!(saved, "completed weather collection run");
    } else {
        for obs in validated.iter().take(3) {
            tracing::info!(
                city = %obs.city_name,
                temperature = obs.temperature,
                condition = obs.weather_condition.as_deref(),
                "sample observation"
            );
        }
        tracing::info!(
            accepted = validated.len(),
            "completed weather collection run (not persisted)"
        );
    }

    Ok(())
}

fn log_outcome(run_type: &str, result: &RunResult) {
    if result.is_success() {
        tracing::info!(
            run_type,
            records = result.records_scraped(),
            "run completed cleanly"
        );
    } else if result.records_scraped() == 0 {
        tracing::warn!(
            run_type,
            errors = result.errors.len(),
            "degraded run: every target failed"
        );
    } else {
        tracing::warn!(
            run_type,
            records = result.records_scraped(),
            errors = result.errors.len(),
            "run completed with partial failures"
        );
    }
}
