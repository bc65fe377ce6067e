//! HTML quote extraction driven by configured CSS selectors.
//!
//! The field → selector mapping from the sources file is resolved into a
//! typed plan at construction time, so the per-document loop does no
//! selector parsing and no per-field type dispatch.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use almanac_core::records::{FieldValue, Provenance, RawRecord};
use almanac_core::{ConfigError, StockConfig};

use crate::run::{ErrorRecord, RunResult};
use crate::transport::ScrapeClient;

/// Fields parsed as signed decimals; everything else is kept as text.
const NUMERIC_FIELDS: [&str; 4] = ["price", "change", "change_percent", "volume"];

/// Sentinel symbol when the URL carries no recognizable ticker token.
const UNKNOWN_SYMBOL: &str = "UNKNOWN";

static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/quote/([A-Z0-9.-]+)").expect("valid symbol regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Numeric,
    Text,
}

struct FieldPlan {
    name: String,
    selector: Selector,
    kind: FieldKind,
}

/// Scraper for quote pages. One [`RawRecord`] per configured URL.
pub struct StockSource {
    urls: Vec<String>,
    plan: Vec<FieldPlan>,
    headers: BTreeMap<String, String>,
}

impl StockSource {
    /// Resolves the configured selector rules into a typed extraction plan.
    ///
    /// Performs no network activity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSelector`] if a rule's CSS selector
    /// does not parse.
    pub fn new(config: &StockConfig) -> Result<Self, ConfigError> {
        let plan = config
            .selectors
            .iter()
            .map(|rule| {
                let selector =
                    Selector::parse(&rule.selector).map_err(|_| ConfigError::InvalidSelector {
                        field: rule.field.clone(),
                        selector: rule.selector.clone(),
                    })?;
                let kind = if NUMERIC_FIELDS.contains(&rule.field.as_str()) {
                    FieldKind::Numeric
                } else {
                    FieldKind::Text
                };
                Ok(FieldPlan {
                    name: rule.field.clone(),
                    selector,
                    kind,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            urls: config.urls.clone(),
            plan,
            headers: config.headers.clone(),
        })
    }

    /// Fetches and extracts every configured URL sequentially.
    ///
    /// A failed target becomes an [`ErrorRecord`]; the batch never aborts
    /// early.
    pub async fn scrape(&self, client: &ScrapeClient) -> RunResult {
        let mut result = RunResult::default();

        for url in &self.urls {
            tracing::info!(url, "scraping stock quote");
            match client.fetch_text(url, &[], &self.headers).await {
                Ok(html) => {
                    result.records.push(self.extract(&html, url));
                    tracing::info!(url, "scraped stock quote");
                }
                Err(err) => {
                    tracing::error!(url, error = %err, "failed to scrape stock quote");
                    result.errors.push(ErrorRecord::new(url.clone(), &err));
                }
            }
        }

        result
    }

    /// Extracts a flat record from one quote page.
    ///
    /// `Html::parse_document` is lenient — malformed markup degrades to
    /// missing nodes, which become `Null` fields with a warning rather than
    /// failures.
    #[must_use]
    pub fn extract(&self, html: &str, url: &str) -> RawRecord {
        let document = Html::parse_document(html);
        let mut record = RawRecord::new(Provenance::Url(url.to_owned()));
        record.set("symbol", FieldValue::Text(symbol_from_url(url)));

        for plan in &self.plan {
            let value = match document.select(&plan.selector).next() {
                Some(element) => {
                    let text = element.text().collect::<String>().trim().to_owned();
                    match plan.kind {
                        FieldKind::Numeric => FieldValue::from(parse_numeric(&text)),
                        FieldKind::Text => FieldValue::Text(text),
                    }
                }
                None => {
                    tracing::warn!(field = %plan.name, url, "selector matched no element");
                    FieldValue::Null
                }
            };
            record.set(plan.name.clone(), value);
        }

        record
    }
}

/// Derives the ticker symbol from the final `/quote/<SYM>` path token.
/// Returns the `UNKNOWN` sentinel when the pattern is absent; never fails.
fn symbol_from_url(url: &str) -> String {
    SYMBOL_RE
        .captures(url)
        .and_then(|cap| cap.get(1))
        .map_or_else(|| UNKNOWN_SYMBOL.to_owned(), |m| m.as_str().to_owned())
}

/// Parses a displayed numeric value as a signed decimal.
///
/// Sentinels (`N/A`, `-`, empty) are `None` without a warning; a
/// parenthesized value denotes negation; `+`, `%`, and thousands separators
/// are stripped. Any other unparseable text is `None` with a warning.
fn parse_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if matches!(trimmed, "" | "N/A" | "-") {
        return None;
    }

    // Negation check must precede stripping, or the parentheses are gone
    // before they can be seen.
    let (negated, inner) = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| !matches!(c, '+' | '%' | ',' | '(' | ')'))
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) => Some(if negated { -value } else { value }),
        Err(_) => {
            tracing::warn!(text, "failed to parse numeric value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almanac_core::SelectorRule;

    fn source_with(selectors: Vec<(&str, &str)>) -> StockSource {
        let config = StockConfig {
            interval_secs: 3600,
            urls: vec!["https://finance.yahoo.com/quote/AAPL".to_owned()],
            selectors: selectors
                .into_iter()
                .map(|(field, selector)| SelectorRule {
                    field: field.to_owned(),
                    selector: selector.to_owned(),
                })
                .collect(),
            headers: BTreeMap::new(),
        };
        StockSource::new(&config).expect("valid test config")
    }

    #[test]
    fn invalid_selector_fails_at_construction() {
        let config = StockConfig {
            interval_secs: 3600,
            urls: vec!["https://example.com/quote/AAPL".to_owned()],
            selectors: vec![SelectorRule {
                field: "price".to_owned(),
                selector: ":::not-a-selector".to_owned(),
            }],
            headers: BTreeMap::new(),
        };
        let result = StockSource::new(&config);
        assert!(
            matches!(result, Err(ConfigError::InvalidSelector { ref field, .. }) if field == "price")
        );
    }

    #[test]
    fn symbol_from_plain_quote_url() {
        assert_eq!(
            symbol_from_url("https://finance.yahoo.com/quote/AAPL"),
            "AAPL"
        );
    }

    #[test]
    fn symbol_from_url_with_trailing_path() {
        assert_eq!(
            symbol_from_url("https://finance.yahoo.com/quote/AAPL/history"),
            "AAPL"
        );
    }

    #[test]
    fn symbol_from_url_with_query() {
        assert_eq!(
            symbol_from_url("https://finance.yahoo.com/quote/AAPL?p=AAPL"),
            "AAPL"
        );
    }

    #[test]
    fn symbol_with_dot_and_dash() {
        assert_eq!(symbol_from_url("https://example.com/quote/BRK.B"), "BRK.B");
        assert_eq!(symbol_from_url("https://example.com/quote/BTC-USD"), "BTC-USD");
    }

    #[test]
    fn unmatched_url_yields_sentinel() {
        assert_eq!(symbol_from_url("https://example.com/invalid"), "UNKNOWN");
    }

    #[test]
    fn parse_numeric_plus_sign() {
        assert_eq!(parse_numeric("+2.75"), Some(2.75));
    }

    #[test]
    fn parse_numeric_parenthesized_is_negative() {
        assert_eq!(parse_numeric("(0.43)"), Some(-0.43));
    }

    #[test]
    fn parse_numeric_thousands_separators() {
        assert_eq!(parse_numeric("65,000,000"), Some(65_000_000.0));
    }

    #[test]
    fn parse_numeric_sentinels() {
        assert_eq!(parse_numeric("N/A"), None);
        assert_eq!(parse_numeric("-"), None);
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("   "), None);
    }

    #[test]
    fn parse_numeric_percent() {
        assert_eq!(parse_numeric("1.85%"), Some(1.85));
    }

    #[test]
    fn parse_numeric_garbage_is_none() {
        assert_eq!(parse_numeric("soon™"), None);
    }

    #[test]
    fn extract_reads_configured_fields() {
        let source = source_with(vec![
            ("price", ".price"),
            ("change", ".change"),
            ("name", ".name"),
        ]);
        let html = r#"
            <html><body>
              <span class="price">150.25</span>
              <span class="change">(0.43)</span>
              <span class="name">Apple Inc.</span>
            </body></html>
        "#;

        let record = source.extract(html, "https://finance.yahoo.com/quote/AAPL");
        assert_eq!(record.text("symbol"), Some("AAPL"));
        assert_eq!(record.number("price"), Some(150.25));
        assert_eq!(record.number("change"), Some(-0.43));
        // Non-numeric field stays text.
        assert_eq!(record.text("name"), Some("Apple Inc."));
    }

    #[test]
    fn missing_selector_yields_null_not_error() {
        let source = source_with(vec![("price", ".price"), ("volume", ".nope")]);
        let record = source.extract(
            "<html><body><span class=\"price\">10.0</span></body></html>",
            "https://finance.yahoo.com/quote/AAPL",
        );
        assert_eq!(record.number("price"), Some(10.0));
        assert_eq!(record.get("volume"), Some(&FieldValue::Null));
    }

    #[test]
    fn unparseable_numeric_text_yields_null() {
        let source = source_with(vec![("price", ".price")]);
        let record = source.extract(
            "<html><body><span class=\"price\">N/A</span></body></html>",
            "https://finance.yahoo.com/quote/AAPL",
        );
        assert_eq!(record.get("price"), Some(&FieldValue::Null));
    }

    #[test]
    fn malformed_markup_degrades_to_nulls() {
        let source = source_with(vec![("price", ".price")]);
        let record = source.extract("<<<<not html", "https://example.com/invalid");
        assert_eq!(record.text("symbol"), Some("UNKNOWN"));
        assert_eq!(record.get("price"), Some(&FieldValue::Null));
    }

    #[test]
    fn repeated_extraction_is_stable_except_timestamp() {
        let source = source_with(vec![("price", ".price")]);
        let html = "<html><body><span class=\"price\">42.0</span></body></html>";
        let url = "https://finance.yahoo.com/quote/AAPL";

        let first = source.extract(html, url);
        let second = source.extract(html, url);
        assert_eq!(first.fields, second.fields);
        assert_eq!(first.provenance, second.provenance);
    }
}
