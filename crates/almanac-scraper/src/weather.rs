//! Weather extraction from a JSON API payload.
//!
//! The payload's nested groups are read defensively: a missing group or key
//! yields `Null` for the corresponding field rather than failing the
//! target. Only an explicit API-level error status fails extraction.

use chrono::{DateTime, Utc};
use serde_json::Value;

use almanac_core::records::{FieldValue, Provenance, RawRecord};
use almanac_core::{CityTarget, ConfigError, WeatherConfig};

use crate::error::ScrapeError;
use crate::run::{ErrorRecord, RunResult};
use crate::transport::ScrapeClient;

/// Scraper for a city-keyed weather API. One [`RawRecord`] per configured
/// city.
pub struct WeatherSource {
    base_url: String,
    cities: Vec<CityTarget>,
    params: Vec<(String, String)>,
    api_key: String,
}

impl WeatherSource {
    /// Builds the source from configuration. Performs no network activity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when no API key is available.
    pub fn new(config: &WeatherConfig, api_key: Option<&str>) -> Result<Self, ConfigError> {
        let api_key = api_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey {
                source_name: "weather".to_owned(),
            })?
            .to_owned();

        Ok(Self {
            base_url: config.base_url.clone(),
            cities: config.cities.clone(),
            params: config
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            api_key,
        })
    }

    /// Fetches and extracts every configured city sequentially.
    ///
    /// A failed target becomes an [`ErrorRecord`]; the batch never aborts
    /// early.
    pub async fn scrape(&self, client: &ScrapeClient) -> RunResult {
        let mut result = RunResult::default();

        for city in &self.cities {
            let target = Provenance::City {
                name: city.name.clone(),
                id: city.id,
            };
            tracing::info!(city = %target, "scraping weather observation");

            let mut query = self.params.clone();
            query.push(("id".to_owned(), city.id.to_string()));
            query.push(("appid".to_owned(), self.api_key.clone()));

            let outcome = match client.fetch_json(&self.base_url, &query).await {
                Ok(payload) => extract(&payload, city),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(record) => {
                    result.records.push(record);
                    tracing::info!(city = %target, "scraped weather observation");
                }
                Err(err) => {
                    tracing::error!(city = %target, error = %err, "failed to scrape weather observation");
                    result.errors.push(ErrorRecord::new(target.to_string(), &err));
                }
            }
        }

        result
    }
}

/// Extracts a flat record from one API payload.
///
/// # Errors
///
/// Returns [`ScrapeError::Api`] when the payload carries an explicit
/// non-200 status code, with the API-provided message.
pub fn extract(payload: &Value, city: &CityTarget) -> Result<RawRecord, ScrapeError> {
    if let Some(cod) = api_status(payload) {
        if cod != 200 {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown API error");
            return Err(ScrapeError::Api {
                target: format!("{} (#{})", city.name, city.id),
                message: message.to_owned(),
            });
        }
    }

    let main = payload.get("main");
    let wind = payload.get("wind");
    let clouds = payload.get("clouds");
    let rain = payload.get("rain");
    let snow = payload.get("snow");
    let sys = payload.get("sys");
    let conditions = payload
        .get("weather")
        .and_then(Value::as_array)
        .and_then(|list| list.first());

    let num =
        |group: Option<&Value>, key: &str| group.and_then(|g| g.get(key)).and_then(Value::as_f64);
    let text = |group: Option<&Value>, key: &str| {
        group
            .and_then(|g| g.get(key))
            .and_then(Value::as_str)
            .map(str::to_owned)
    };
    let epoch = |group: Option<&Value>, key: &str| {
        group
            .and_then(|g| g.get(key))
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    };

    let mut record = RawRecord::new(Provenance::City {
        name: city.name.clone(),
        id: city.id,
    });

    record.set("temperature", FieldValue::from(num(main, "temp")));
    record.set("feels_like", FieldValue::from(num(main, "feels_like")));
    record.set("humidity", FieldValue::from(num(main, "humidity")));
    record.set("pressure", FieldValue::from(num(main, "pressure")));
    record.set("wind_speed", FieldValue::from(num(wind, "speed")));
    record.set("wind_direction", FieldValue::from(num(wind, "deg")));
    record.set("cloudiness", FieldValue::from(num(clouds, "all")));
    record.set(
        "weather_condition",
        FieldValue::from(text(conditions, "main")),
    );
    record.set(
        "weather_description",
        FieldValue::from(text(conditions, "description")),
    );
    record.set("weather_icon", FieldValue::from(text(conditions, "icon")));
    record.set("rain_1h", FieldValue::from(num(rain, "1h")));
    record.set("snow_1h", FieldValue::from(num(snow, "1h")));
    record.set("sunrise", FieldValue::from(epoch(sys, "sunrise")));
    record.set("sunset", FieldValue::from(epoch(sys, "sunset")));
    record.set(
        "timezone_offset",
        FieldValue::from(payload.get("timezone").and_then(Value::as_f64)),
    );

    Ok(record)
}

/// The API's own status code, when present. Serialized as a number on some
/// endpoints and as a string on others; both are accepted.
fn api_status(payload: &Value) -> Option<i64> {
    match payload.get("cod") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}
