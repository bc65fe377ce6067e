pub mod app_config;
mod config;
pub mod records;
pub mod sources;
pub mod validate;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{ErrorKind, FieldValue, Provenance, RawRecord};
pub use sources::{load_sources, CityTarget, SelectorRule, SourcesFile, StockConfig, WeatherConfig};
pub use validate::{validate_observations, validate_quotes, StockQuote, WeatherObservation};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("sources validation failed: {0}")]
    Validation(String),

    #[error("invalid selector for field \"{field}\": {selector}")]
    InvalidSelector { field: String, selector: String },

    #[error("{source_name} source requires an API key (set WEATHER_API_KEY)")]
    MissingApiKey { source_name: String },
}
