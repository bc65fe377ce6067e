//! Long-running mode: each configured source repeats on its own interval.
//!
//! Initialises a [`JobScheduler`], runs every source once at startup, then
//! registers one repeating job per source. Job failures are logged and the
//! scheduler keeps running; only startup errors and Ctrl-C end the process.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use almanac_core::{AppConfig, SourcesFile, StockConfig, WeatherConfig};

use crate::collect;

/// Entry point for `almanac schedule`.
pub(crate) async fn run(config: AppConfig, sources: SourcesFile) -> anyhow::Result<()> {
    let pool = almanac_db::connect_pool(&config.database_url, (&config).into()).await?;
    almanac_db::ping(&pool).await?;

    let config = Arc::new(config);

    // First pass runs immediately so a fresh deployment produces data
    // before the first interval elapses.
    if let Some(stocks) = &sources.stocks {
        run_stock_job(&config, stocks, &pool).await;
    }
    if let Some(weather) = &sources.weather {
        run_weather_job(&config, weather, &pool).await;
    }

    let scheduler = JobScheduler::new().await?;

    if let Some(stocks) = &sources.stocks {
        register_stock_job(&scheduler, Arc::clone(&config), stocks.clone(), pool.clone()).await?;
        tracing::info!(interval_secs = stocks.interval_secs, "scheduled stock source");
    }
    if let Some(weather) = &sources.weather {
        register_weather_job(&scheduler, Arc::clone(&config), weather.clone(), pool.clone())
            .await?;
        tracing::info!(
            interval_secs = weather.interval_secs,
            "scheduled weather source"
        );
    }

    scheduler.start().await?;
    tracing::info!("scheduler started; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received; stopping scheduler");

    let mut scheduler = scheduler;
    scheduler.shutdown().await?;
    Ok(())
}

async fn register_stock_job(
    scheduler: &JobScheduler,
    config: Arc<AppConfig>,
    stocks: StockConfig,
    pool: PgPool,
) -> Result<(), JobSchedulerError> {
    let stocks = Arc::new(stocks);
    let pool = Arc::new(pool);

    let interval = Duration::from_secs(stocks.interval_secs);
    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let config = Arc::clone(&config);
        let stocks = Arc::clone(&stocks);
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            run_stock_job(&config, &stocks, &pool).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn register_weather_job(
    scheduler: &JobScheduler,
    config: Arc<AppConfig>,
    weather: WeatherConfig,
    pool: PgPool,
) -> Result<(), JobSchedulerError> {
    let weather = Arc::new(weather);
    let pool = Arc::new(pool);

    let interval = Duration::from_secs(weather.interval_secs);
    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let config = Arc::clone(&config);
        let weather = Arc::clone(&weather);
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            run_weather_job(&config, &weather, &pool).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// One scheduled stock run. Errors are logged, never propagated, so a
/// failing run does not unschedule the job.
async fn run_stock_job(config: &AppConfig, stocks: &StockConfig, pool: &PgPool) {
    if let Err(e) = collect::run_stocks(config, stocks, Some(pool)).await {
        tracing::error!(error = %e, "scheduled stock run failed");
    }
}

/// One scheduled weather run. Errors are logged, never propagated.
async fn run_weather_job(config: &AppConfig, weather: &WeatherConfig, pool: &PgPool) {
    if let Err(e) = collect::run_weather(config, weather, Some(pool)).await {
        tracing::error!(error = %e, "scheduled weather run failed");
    }
}
