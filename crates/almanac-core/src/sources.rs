//! Source configuration: which pages and cities to collect, and how.
//!
//! Loaded from a YAML file (see `config/sources.yaml`). Required keys are
//! enforced by serde at parse time; structural rules (non-empty target
//! lists, unique field names) are checked afterwards so a misconfigured
//! source fails before any network activity.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesFile {
    #[serde(default)]
    pub stocks: Option<StockConfig>,
    #[serde(default)]
    pub weather: Option<WeatherConfig>,
}

/// Configuration for the HTML quote source.
#[derive(Debug, Clone, Deserialize)]
pub struct StockConfig {
    /// Seconds between scheduled runs.
    #[serde(default = "default_stock_interval")]
    pub interval_secs: u64,
    pub urls: Vec<String>,
    /// Ordered field → CSS selector rules.
    pub selectors: Vec<SelectorRule>,
    /// Optional header overrides (e.g. `User-Agent`).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorRule {
    pub field: String,
    pub selector: String,
}

/// Configuration for the weather API source.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    /// Seconds between scheduled runs.
    #[serde(default = "default_weather_interval")]
    pub interval_secs: u64,
    pub base_url: String,
    pub cities: Vec<CityTarget>,
    /// Shared query parameters sent with every request (e.g. `units`).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityTarget {
    pub name: String,
    pub id: i64,
}

fn default_stock_interval() -> u64 {
    3600
}

fn default_weather_interval() -> u64 {
    7200
}

/// Load and validate the source configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sources: SourcesFile = serde_yaml::from_str(&content)?;

    validate_sources(&sources)?;

    Ok(sources)
}

fn validate_sources(sources: &SourcesFile) -> Result<(), ConfigError> {
    if sources.stocks.is_none() && sources.weather.is_none() {
        return Err(ConfigError::Validation(
            "sources file configures neither 'stocks' nor 'weather'".to_string(),
        ));
    }

    if let Some(stocks) = &sources.stocks {
        validate_stocks(stocks)?;
    }

    if let Some(weather) = &sources.weather {
        validate_weather(weather)?;
    }

    Ok(())
}

fn validate_stocks(stocks: &StockConfig) -> Result<(), ConfigError> {
    if stocks.urls.is_empty() {
        return Err(ConfigError::Validation(
            "stocks.urls must list at least one URL".to_string(),
        ));
    }

    if stocks.selectors.is_empty() {
        return Err(ConfigError::Validation(
            "stocks.selectors must list at least one rule".to_string(),
        ));
    }

    let mut seen_fields = HashSet::new();
    for rule in &stocks.selectors {
        if rule.field.trim().is_empty() {
            return Err(ConfigError::Validation(
                "stocks.selectors entries must name a field".to_string(),
            ));
        }
        if rule.selector.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "selector for field '{}' is empty",
                rule.field
            )));
        }
        if !seen_fields.insert(rule.field.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate selector field: '{}'",
                rule.field
            )));
        }
    }

    Ok(())
}

fn validate_weather(weather: &WeatherConfig) -> Result<(), ConfigError> {
    if weather.base_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "weather.base_url must be non-empty".to_string(),
        ));
    }

    if weather.cities.is_empty() {
        return Err(ConfigError::Validation(
            "weather.cities must list at least one city".to_string(),
        ));
    }

    for city in &weather.cities {
        if city.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "city #{} has an empty name",
                city.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<SourcesFile, ConfigError> {
        let sources: SourcesFile = serde_yaml::from_str(yaml)?;
        validate_sources(&sources)?;
        Ok(sources)
    }

    const VALID: &str = r#"
stocks:
  urls:
    - https://finance.yahoo.com/quote/AAPL
  selectors:
    - field: price
      selector: "fin-streamer[data-field='regularMarketPrice']"
    - field: change
      selector: "fin-streamer[data-field='regularMarketChange']"
weather:
  base_url: https://api.openweathermap.org/data/2.5/weather
  params:
    units: metric
  cities:
    - name: New York
      id: 5128581
"#;

    #[test]
    fn parses_valid_sources() {
        let sources = parse(VALID).unwrap();
        let stocks = sources.stocks.unwrap();
        assert_eq!(stocks.urls.len(), 1);
        assert_eq!(stocks.selectors.len(), 2);
        assert_eq!(stocks.selectors[0].field, "price");
        assert_eq!(stocks.interval_secs, 3600);

        let weather = sources.weather.unwrap();
        assert_eq!(weather.cities.len(), 1);
        assert_eq!(weather.cities[0].id, 5_128_581);
        assert_eq!(weather.params.get("units").map(String::as_str), Some("metric"));
        assert_eq!(weather.interval_secs, 7200);
    }

    #[test]
    fn missing_urls_key_fails_at_parse() {
        let yaml = r#"
stocks:
  selectors:
    - field: price
      selector: ".price"
"#;
        let result = parse(yaml);
        assert!(
            matches!(result, Err(ConfigError::SourcesFileParse(_))),
            "expected SourcesFileParse, got: {result:?}"
        );
    }

    #[test]
    fn missing_selectors_key_fails_at_parse() {
        let yaml = r#"
stocks:
  urls: [https://example.com/quote/AAPL]
"#;
        let result = parse(yaml);
        assert!(matches!(result, Err(ConfigError::SourcesFileParse(_))));
    }

    #[test]
    fn missing_api_base_url_fails_at_parse() {
        let yaml = r#"
weather:
  cities:
    - name: New York
      id: 5128581
"#;
        let result = parse(yaml);
        assert!(matches!(result, Err(ConfigError::SourcesFileParse(_))));
    }

    #[test]
    fn empty_url_list_is_rejected() {
        let yaml = r#"
stocks:
  urls: []
  selectors:
    - field: price
      selector: ".price"
"#;
        let result = parse(yaml);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn empty_city_list_is_rejected() {
        let yaml = r#"
weather:
  base_url: https://api.example.com/weather
  cities: []
"#;
        let result = parse(yaml);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn duplicate_selector_field_is_rejected() {
        let yaml = r#"
stocks:
  urls: [https://example.com/quote/AAPL]
  selectors:
    - field: price
      selector: ".a"
    - field: price
      selector: ".b"
"#;
        let result = parse(yaml);
        assert!(
            matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("duplicate")),
            "expected duplicate-field rejection, got: {result:?}"
        );
    }

    #[test]
    fn selector_order_is_preserved() {
        let sources = parse(VALID).unwrap();
        let stocks = sources.stocks.unwrap();
        let fields: Vec<&str> = stocks
            .selectors
            .iter()
            .map(|r| r.field.as_str())
            .collect();
        assert_eq!(fields, ["price", "change"]);
    }

    #[test]
    fn completely_empty_file_is_rejected() {
        let result = parse("{}");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
