//! Validation gate between raw extraction and storage.
//!
//! Converts [`RawRecord`]s into typed, range-checked records. Rejection is
//! per-record: an invalid entry is dropped with a warning and the rest of
//! the batch proceeds. Only price, symbol, temperature, and city name carry
//! constraints; every other field passes through unchecked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::{Provenance, RawRecord};

/// An equity quote that passed validation and is eligible for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub price: f64,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<i64>,
    pub scrape_url: String,
    pub captured_at: DateTime<Utc>,
}

/// A weather observation that passed validation and is eligible for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub city_name: String,
    pub city_id: i64,
    pub temperature: f64,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<i32>,
    pub cloudiness: Option<f64>,
    pub weather_condition: Option<String>,
    pub weather_description: Option<String>,
    pub weather_icon: Option<String>,
    pub rain_1h: Option<f64>,
    pub snow_1h: Option<f64>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub timezone_offset: Option<i32>,
    pub captured_at: DateTime<Utc>,
}

/// Validates a batch of raw quote records, silently dropping invalid entries.
///
/// Each rejection is logged with its reason. Never fails the batch.
#[must_use]
pub fn validate_quotes(raw: &[RawRecord]) -> Vec<StockQuote> {
    raw.iter()
        .filter_map(|record| match quote_from_raw(record) {
            Ok(quote) => Some(quote),
            Err(reason) => {
                tracing::warn!(
                    provenance = %record.provenance,
                    reason,
                    "rejected stock record"
                );
                None
            }
        })
        .collect()
}

/// Validates a batch of raw weather records, silently dropping invalid entries.
///
/// Each rejection is logged with its reason. Never fails the batch.
#[must_use]
pub fn validate_observations(raw: &[RawRecord]) -> Vec<WeatherObservation> {
    raw.iter()
        .filter_map(|record| match observation_from_raw(record) {
            Ok(obs) => Some(obs),
            Err(reason) => {
                tracing::warn!(
                    provenance = %record.provenance,
                    reason,
                    "rejected weather record"
                );
                None
            }
        })
        .collect()
}

fn quote_from_raw(raw: &RawRecord) -> Result<StockQuote, String> {
    let Provenance::Url(scrape_url) = &raw.provenance else {
        return Err("stock record carries non-URL provenance".to_string());
    };

    let symbol = raw
        .text("symbol")
        .ok_or_else(|| "missing symbol".to_string())?;
    if symbol.is_empty() || symbol.len() > 10 {
        return Err(format!(
            "symbol must be non-empty and <= 10 characters, got {symbol:?}"
        ));
    }

    let price = raw
        .number("price")
        .ok_or_else(|| "missing or non-numeric price".to_string())?;
    if price <= 0.0 {
        return Err(format!("price must be positive, got {price}"));
    }

    Ok(StockQuote {
        symbol: symbol.to_string(),
        price,
        change: raw.number("change"),
        change_percent: raw.number("change_percent"),
        // Parsed from text with thousands separators; stored as a count.
        #[allow(clippy::cast_possible_truncation)]
        volume: raw.number("volume").map(|v| v as i64),
        scrape_url: scrape_url.clone(),
        captured_at: raw.captured_at,
    })
}

fn observation_from_raw(raw: &RawRecord) -> Result<WeatherObservation, String> {
    let Provenance::City { name, id } = &raw.provenance else {
        return Err("weather record carries non-city provenance".to_string());
    };

    if name.is_empty() || name.len() > 100 {
        return Err(format!(
            "city name must be non-empty and <= 100 characters, got {name:?}"
        ));
    }

    let temperature = raw
        .number("temperature")
        .ok_or_else(|| "missing or non-numeric temperature".to_string())?;
    if !(-100.0..=100.0).contains(&temperature) {
        return Err(format!(
            "temperature must be between -100 and 100 Celsius, got {temperature}"
        ));
    }

    #[allow(clippy::cast_possible_truncation)]
    let as_i32 = |field: &str| raw.number(field).map(|v| v as i32);

    Ok(WeatherObservation {
        city_name: name.clone(),
        city_id: *id,
        temperature,
        feels_like: raw.number("feels_like"),
        humidity: raw.number("humidity"),
        pressure: raw.number("pressure"),
        wind_speed: raw.number("wind_speed"),
        wind_direction: as_i32("wind_direction"),
        cloudiness: raw.number("cloudiness"),
        weather_condition: raw.text("weather_condition").map(str::to_string),
        weather_description: raw.text("weather_description").map(str::to_string),
        weather_icon: raw.text("weather_icon").map(str::to_string),
        rain_1h: raw.number("rain_1h"),
        snow_1h: raw.number("snow_1h"),
        sunrise: raw.timestamp("sunrise"),
        sunset: raw.timestamp("sunset"),
        timezone_offset: as_i32("timezone_offset"),
        captured_at: raw.captured_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::FieldValue;

    fn stock_raw(symbol: &str, price: Option<f64>) -> RawRecord {
        let mut record = RawRecord::new(Provenance::Url(
            "https://finance.yahoo.com/quote/AAPL".to_string(),
        ));
        record.set("symbol", FieldValue::Text(symbol.to_string()));
        record.set("price", FieldValue::from(price));
        record
    }

    fn weather_raw(city: &str, temperature: Option<f64>) -> RawRecord {
        let mut record = RawRecord::new(Provenance::City {
            name: city.to_string(),
            id: 5_128_581,
        });
        record.set("temperature", FieldValue::from(temperature));
        record
    }

    #[test]
    fn accepts_valid_quote() {
        let mut raw = stock_raw("AAPL", Some(150.25));
        raw.set("change", FieldValue::Number(2.75));
        raw.set("change_percent", FieldValue::Number(1.85));
        raw.set("volume", FieldValue::Number(65_000_000.0));

        let accepted = validate_quotes(&[raw]);
        assert_eq!(accepted.len(), 1);
        let quote = &accepted[0];
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, 150.25);
        assert_eq!(quote.volume, Some(65_000_000));
        assert_eq!(quote.scrape_url, "https://finance.yahoo.com/quote/AAPL");
    }

    #[test]
    fn rejects_negative_price() {
        let accepted = validate_quotes(&[stock_raw("AAPL", Some(-10.0))]);
        assert!(accepted.is_empty());
    }

    #[test]
    fn rejects_missing_price() {
        let accepted = validate_quotes(&[stock_raw("AAPL", None)]);
        assert!(accepted.is_empty());
    }

    #[test]
    fn rejects_empty_symbol() {
        let accepted = validate_quotes(&[stock_raw("", Some(150.0))]);
        assert!(accepted.is_empty());
    }

    #[test]
    fn rejects_overlong_symbol() {
        let accepted = validate_quotes(&[stock_raw("ABCDEFGHIJK", Some(150.0))]);
        assert!(accepted.is_empty());
    }

    #[test]
    fn missing_optional_quote_fields_pass_through_as_none() {
        let accepted = validate_quotes(&[stock_raw("MSFT", Some(300.0))]);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].change, None);
        assert_eq!(accepted[0].change_percent, None);
        assert_eq!(accepted[0].volume, None);
    }

    #[test]
    fn one_invalid_quote_does_not_discard_the_batch() {
        let accepted = validate_quotes(&[
            stock_raw("AAPL", Some(150.25)),
            stock_raw("BAD", Some(-1.0)),
            stock_raw("MSFT", Some(300.0)),
        ]);
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].symbol, "AAPL");
        assert_eq!(accepted[1].symbol, "MSFT");
    }

    #[test]
    fn accepts_valid_observation() {
        let accepted = validate_observations(&[weather_raw("New York", Some(22.5))]);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].city_name, "New York");
        assert_eq!(accepted[0].temperature, 22.5);
    }

    #[test]
    fn rejects_temperature_out_of_range() {
        let accepted = validate_observations(&[weather_raw("New York", Some(150.0))]);
        assert!(accepted.is_empty());
    }

    #[test]
    fn accepts_boundary_temperatures() {
        let accepted = validate_observations(&[
            weather_raw("Vostok", Some(-100.0)),
            weather_raw("Furnace Creek", Some(100.0)),
        ]);
        assert_eq!(accepted.len(), 2);
    }

    #[test]
    fn rejects_empty_city_name() {
        let accepted = validate_observations(&[weather_raw("", Some(20.0))]);
        assert!(accepted.is_empty());
    }

    #[test]
    fn unconstrained_fields_are_not_range_checked() {
        // change/change_percent/volume intentionally carry no bounds.
        let mut raw = stock_raw("AAPL", Some(1.0));
        raw.set("change", FieldValue::Number(-1.0e12));
        raw.set("change_percent", FieldValue::Number(99_999.0));
        let accepted = validate_quotes(&[raw]);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].change, Some(-1.0e12));
    }

    #[test]
    fn timestamps_flow_through() {
        let mut raw = weather_raw("New York", Some(20.0));
        let sunrise = chrono::DateTime::from_timestamp(1_717_200_000, 0).unwrap();
        raw.set("sunrise", FieldValue::Timestamp(sunrise));
        let accepted = validate_observations(&[raw]);
        assert_eq!(accepted[0].sunrise, Some(sunrise));
        assert_eq!(accepted[0].sunset, None);
    }
}
