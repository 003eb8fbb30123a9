use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::http_client::{HttpClient, HttpError, HttpRequest};
use crate::{FetchError, Interval, QuoteRecord, Symbol};

/// Provenance tag written to `stock_prices.source`.
pub const ALPHA_VANTAGE_SOURCE: &str = "alpha_vantage";

/// Layout of the series keys, e.g. `2026-02-20 15:55:00`.
const PROVIDER_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Top-level keys Alpha Vantage uses instead of a series when it refuses a call.
const ADVISORY_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

const OPEN_FIELD: &str = "1. open";
const HIGH_FIELD: &str = "2. high";
const LOW_FIELD: &str = "3. low";
const CLOSE_FIELD: &str = "4. close";
const VOLUME_FIELD: &str = "5. volume";

/// Fetches the latest intraday quote for one symbol from `TIME_SERIES_INTRADAY`.
///
/// One request per call and no retry: a failed attempt is returned as a
/// [`FetchError`] and the caller decides what happens to the symbol.
#[derive(Clone)]
pub struct AlphaVantageFetcher {
    http_client: Arc<dyn HttpClient>,
    provider: ProviderConfig,
}

impl AlphaVantageFetcher {
    pub fn new(http_client: Arc<dyn HttpClient>, provider: ProviderConfig) -> Self {
        Self {
            http_client,
            provider,
        }
    }

    /// Fetch, validate and normalize the most recent quote for `raw_symbol`.
    pub async fn fetch(&self, raw_symbol: &str) -> Result<QuoteRecord, FetchError> {
        let symbol = Symbol::parse(raw_symbol).map_err(|source| FetchError::InvalidSymbol {
            input: raw_symbol.trim().to_owned(),
            source,
        })?;

        let timeout_ms = self.provider.timeout_ms;
        let api_key = urlencoding::encode(&self.provider.api_key);
        let request = HttpRequest::get(self.endpoint(&symbol, &api_key))
            .with_header("accept", "application/json")
            .with_timeout_ms(timeout_ms);

        debug!(
            symbol = %symbol,
            endpoint = %self.endpoint(&symbol, "***"),
            timeout_ms,
            "requesting intraday quote"
        );

        // The transport enforces the timeout too; this bounds custom clients as well.
        let response = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.http_client.execute(request),
        )
        .await
        .unwrap_or_else(|_| Err(HttpError::timeout(timeout_ms)))
        .map_err(|error| FetchError::Transport {
            symbol: symbol.to_string(),
            message: error.message().to_owned(),
        })?;

        if !response.is_success() {
            return Err(FetchError::Status {
                symbol: symbol.to_string(),
                status: response.status,
            });
        }

        let record = normalize_quote(&symbol, self.provider.interval, &response.body)?;
        info!(
            symbol = %record.symbol,
            api_timestamp = %record.api_timestamp,
            close = record.close_price,
            volume = record.volume,
            "quote fetched"
        );
        Ok(record)
    }

    /// `apikey` is inserted as given; callers pass it already encoded.
    fn endpoint(&self, symbol: &Symbol, apikey: &str) -> String {
        let base = self.provider.base_url.as_str();
        let separator = if base.contains('?') { '&' } else { '?' };
        format!(
            "{base}{separator}function=TIME_SERIES_INTRADAY&symbol={}&interval={}&apikey={apikey}",
            urlencoding::encode(symbol.as_str()),
            self.provider.interval.as_str(),
        )
    }
}

/// Turn a `TIME_SERIES_INTRADAY` response body into a [`QuoteRecord`].
///
/// The entry with the greatest timestamp wins regardless of key order. The whole
/// parsed body becomes `raw_payload`, not only the selected entry.
pub fn normalize_quote(
    symbol: &Symbol,
    interval: Interval,
    body: &str,
) -> Result<QuoteRecord, FetchError> {
    let payload: Value = serde_json::from_str(body).map_err(|error| FetchError::SchemaMismatch {
        symbol: symbol.to_string(),
        detail: format!("response body is not JSON: {error}"),
    })?;

    let series_key = interval.series_key();
    let series = match payload.get(&series_key) {
        Some(Value::Object(series)) => series,
        Some(_) => {
            return Err(FetchError::SchemaMismatch {
                symbol: symbol.to_string(),
                detail: format!("'{series_key}' is not an object"),
            })
        }
        None => {
            return Err(FetchError::SchemaMismatch {
                symbol: symbol.to_string(),
                detail: describe_missing_series(&payload, &series_key),
            })
        }
    };

    let (timestamp, api_timestamp, entry) = latest_entry(symbol, &series_key, series)?;
    let fields = EntryFields {
        symbol,
        timestamp,
        entry,
    };

    let open_price = fields.price(OPEN_FIELD)?;
    let high_price = fields.price(HIGH_FIELD)?;
    let low_price = fields.price(LOW_FIELD)?;
    let close_price = fields.price(CLOSE_FIELD)?;
    let volume = fields.volume(VOLUME_FIELD)?;

    Ok(QuoteRecord {
        symbol: symbol.to_string(),
        price: close_price,
        open_price,
        high_price,
        low_price,
        close_price,
        volume,
        api_timestamp,
        source: ALPHA_VANTAGE_SOURCE.to_owned(),
        raw_payload: payload,
    })
}

fn describe_missing_series(payload: &Value, series_key: &str) -> String {
    let advisory = ADVISORY_KEYS
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str));

    match advisory {
        Some(text) => format!("missing '{series_key}'; provider said: {text}"),
        None => format!("missing '{series_key}'"),
    }
}

fn latest_entry<'a>(
    symbol: &Symbol,
    series_key: &str,
    series: &'a Map<String, Value>,
) -> Result<(&'a str, PrimitiveDateTime, &'a Map<String, Value>), FetchError> {
    let mut latest: Option<(&'a str, PrimitiveDateTime, &'a Value)> = None;

    for (key, entry) in series {
        let parsed = PrimitiveDateTime::parse(key, PROVIDER_TIMESTAMP).map_err(|_| {
            FetchError::TimestampParse {
                symbol: symbol.to_string(),
                value: key.clone(),
            }
        })?;

        if latest.map_or(true, |(_, current, _)| parsed > current) {
            latest = Some((key.as_str(), parsed, entry));
        }
    }

    let Some((key, parsed, entry)) = latest else {
        return Err(FetchError::SchemaMismatch {
            symbol: symbol.to_string(),
            detail: format!("'{series_key}' is empty"),
        });
    };

    let entry = entry.as_object().ok_or_else(|| FetchError::SchemaMismatch {
        symbol: symbol.to_string(),
        detail: format!("entry at {key} is not an object"),
    })?;

    Ok((key, parsed, entry))
}

/// Field accessors for the selected series entry.
struct EntryFields<'a> {
    symbol: &'a Symbol,
    timestamp: &'a str,
    entry: &'a Map<String, Value>,
}

impl EntryFields<'_> {
    fn price(&self, field: &'static str) -> Result<f64, FetchError> {
        let value = match self.raw(field)? {
            Value::String(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| self.coercion(field, format!("'{text}' is not numeric")))?,
            Value::Number(number) => number
                .as_f64()
                .ok_or_else(|| self.coercion(field, format!("{number} is out of range")))?,
            other => return Err(self.coercion(field, format!("unexpected value {other}"))),
        };

        if !value.is_finite() {
            return Err(self.coercion(field, String::from("must be finite")));
        }
        if value < 0.0 {
            return Err(self.coercion(field, format!("{value} is negative")));
        }
        Ok(value)
    }

    fn volume(&self, field: &'static str) -> Result<u64, FetchError> {
        match self.raw(field)? {
            Value::String(text) => text.trim().parse::<u64>().map_err(|_| {
                self.coercion(field, format!("'{text}' is not a non-negative integer"))
            }),
            Value::Number(number) => number.as_u64().ok_or_else(|| {
                self.coercion(field, format!("{number} is not a non-negative integer"))
            }),
            other => Err(self.coercion(field, format!("unexpected value {other}"))),
        }
    }

    fn raw(&self, field: &'static str) -> Result<&Value, FetchError> {
        self.entry
            .get(field)
            .ok_or_else(|| self.coercion(field, String::from("field is missing")))
    }

    fn coercion(&self, field: &'static str, detail: String) -> FetchError {
        FetchError::FieldCoercion {
            symbol: self.symbol.to_string(),
            timestamp: self.timestamp.to_owned(),
            field,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FetchErrorKind;
    use serde_json::json;
    use time::macros::datetime;

    fn aapl() -> Symbol {
        Symbol::parse("AAPL").expect("valid symbol")
    }

    fn entry(open: &str, high: &str, low: &str, close: &str, volume: &str) -> Value {
        json!({
            "1. open": open,
            "2. high": high,
            "3. low": low,
            "4. close": close,
            "5. volume": volume,
        })
    }

    #[test]
    fn selects_the_greatest_timestamp_not_the_first_key() {
        let body = json!({
            "Meta Data": {"2. Symbol": "AAPL", "4. Interval": "5min"},
            "Time Series (5min)": {
                "2026-02-20 15:45:00": entry("188.0", "188.5", "187.9", "188.2", "900"),
                "2026-02-20 15:55:00": entry("189.5", "190.25", "189.1", "189.98", "1200"),
                "2026-02-20 15:50:00": entry("188.2", "189.6", "188.1", "189.5", "1100"),
            }
        })
        .to_string();

        let record = normalize_quote(&aapl(), Interval::FiveMinutes, &body).expect("normalize");

        assert_eq!(record.api_timestamp, datetime!(2026-02-20 15:55:00));
        assert_eq!(record.close_price, 189.98);
        assert_eq!(record.price, record.close_price);
        assert_eq!(record.volume, 1200);
        assert_eq!(record.source, ALPHA_VANTAGE_SOURCE);
    }

    #[test]
    fn raw_payload_is_the_whole_response() {
        let body = json!({
            "Meta Data": {"1. Information": "Intraday (5min) open, high, low, close prices and volume"},
            "Time Series (5min)": {
                "2026-02-20 15:55:00": entry("1", "2", "0.5", "1.5", "10"),
            }
        });

        let record = normalize_quote(&aapl(), Interval::FiveMinutes, &body.to_string())
            .expect("normalize");
        assert_eq!(record.raw_payload, body);
    }

    #[test]
    fn missing_series_key_is_a_schema_mismatch_with_provider_text() {
        let body = json!({"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."})
            .to_string();

        let error = normalize_quote(&aapl(), Interval::FiveMinutes, &body).expect_err("no series");
        assert_eq!(error.kind(), FetchErrorKind::SchemaMismatch);
        assert!(error.to_string().contains("standard API call frequency"));
    }

    #[test]
    fn series_for_another_interval_does_not_match() {
        let body = json!({
            "Time Series (1min)": {"2026-02-20 15:55:00": entry("1", "2", "0.5", "1.5", "10")}
        })
        .to_string();

        let error = normalize_quote(&aapl(), Interval::FiveMinutes, &body).expect_err("wrong key");
        assert_eq!(error.kind(), FetchErrorKind::SchemaMismatch);
    }

    #[test]
    fn non_json_body_and_empty_series_are_schema_mismatches() {
        let not_json = normalize_quote(&aapl(), Interval::FiveMinutes, "<html>busy</html>")
            .expect_err("not json");
        assert_eq!(not_json.kind(), FetchErrorKind::SchemaMismatch);

        let empty = json!({"Time Series (5min)": {}}).to_string();
        let error = normalize_quote(&aapl(), Interval::FiveMinutes, &empty).expect_err("empty");
        assert_eq!(error.kind(), FetchErrorKind::SchemaMismatch);
    }

    #[test]
    fn non_numeric_field_is_a_coercion_error() {
        let body = json!({
            "Time Series (5min)": {
                "2026-02-20 15:55:00": entry("189.5", "n/a", "189.1", "189.98", "1200"),
            }
        })
        .to_string();

        let error = normalize_quote(&aapl(), Interval::FiveMinutes, &body).expect_err("bad high");
        assert!(matches!(
            error,
            FetchError::FieldCoercion { field: HIGH_FIELD, .. }
        ));
    }

    #[test]
    fn fractional_or_missing_volume_is_a_coercion_error() {
        let fractional = json!({
            "Time Series (5min)": {
                "2026-02-20 15:55:00": entry("1", "2", "0.5", "1.5", "10.5"),
            }
        })
        .to_string();
        let error =
            normalize_quote(&aapl(), Interval::FiveMinutes, &fractional).expect_err("fraction");
        assert!(matches!(
            error,
            FetchError::FieldCoercion { field: VOLUME_FIELD, .. }
        ));

        let missing = json!({
            "Time Series (5min)": {
                "2026-02-20 15:55:00": {"1. open": "1", "2. high": "2", "3. low": "0.5", "4. close": "1.5"},
            }
        })
        .to_string();
        let error = normalize_quote(&aapl(), Interval::FiveMinutes, &missing).expect_err("missing");
        assert_eq!(error.kind(), FetchErrorKind::FieldCoercion);
    }

    #[test]
    fn numeric_json_values_are_accepted() {
        let body = json!({
            "Time Series (5min)": {
                "2026-02-20 15:55:00": {
                    "1. open": 10.5, "2. high": 11, "3. low": 10, "4. close": 10.75, "5. volume": 42
                },
            }
        })
        .to_string();

        let record = normalize_quote(&aapl(), Interval::FiveMinutes, &body).expect("normalize");
        assert_eq!(record.high_price, 11.0);
        assert_eq!(record.volume, 42);
    }

    #[test]
    fn malformed_series_key_is_a_timestamp_error() {
        let body = json!({
            "Time Series (5min)": {
                "2026-02-20T15:55:00Z": entry("1", "2", "0.5", "1.5", "10"),
            }
        })
        .to_string();

        let error = normalize_quote(&aapl(), Interval::FiveMinutes, &body).expect_err("iso key");
        assert_eq!(
            error,
            FetchError::TimestampParse {
                symbol: String::from("AAPL"),
                value: String::from("2026-02-20T15:55:00Z"),
            }
        );
    }
}
