mod collect;
mod schedule;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "almanac")]
#[command(about = "Periodic collection of market quotes and weather observations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one collection pass and exit.
    Collect {
        #[arg(long, value_enum, default_value_t = SourceArg::All)]
        source: SourceArg,
        /// Skip the database; log validated samples instead.
        #[arg(long)]
        dry_run: bool,
    },
    /// Run every source once, then repeat each on its configured interval.
    Schedule,
    /// Apply pending database migrations and exit.
    Migrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    Stocks,
    Weather,
    All,
}

impl From<SourceArg> for collect::Selection {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Stocks => collect::Selection::Stocks,
            SourceArg::Weather => collect::Selection::Weather,
            SourceArg::All => collect::Selection::All,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Loads .env before reading any config.
    let config = almanac_core::load_app_config()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let sources = almanac_core::load_sources(&config.sources_path)?;
    tracing::info!(
        stocks = sources.stocks.is_some(),
        weather = sources.weather.is_some(),
        "loaded source configuration"
    );

    match cli.command {
        Commands::Collect { source, dry_run } => {
            collect::run(&config, &sources, source.into(), dry_run).await
        }
        Commands::Schedule => schedule::run(config, sources).await,
        Commands::Migrate => {
            let pool =
                almanac_db::connect_pool(&config.database_url, (&config).into()).await?;
            almanac_db::run_migrations(&pool).await?;
            tracing::info!("migrations applied");
            Ok(())
        }
    }
}
