use serde_json::Value;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Second-precision timestamp layout shared by the provider and the `stock_prices` table.
pub const SQL_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Microsecond-precision layout used for `fetched_at`.
pub(crate) const SQL_TIMESTAMP_MICROS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");

/// A normalized intraday quote ready for persistence.
///
/// `(symbol, api_timestamp)` is the natural key: the warehouse holds at most one
/// row per pair and a later write for the same pair overwrites every other field.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    /// Uppercase ticker (e.g., "AAPL").
    pub symbol: String,
    /// Current price; the provider's latest close.
    pub price: f64,
    /// Opening price of the interval.
    pub open_price: f64,
    /// High price of the interval.
    pub high_price: f64,
    /// Low price of the interval.
    pub low_price: f64,
    /// Closing price of the interval.
    pub close_price: f64,
    /// Traded volume in the interval.
    pub volume: u64,
    /// Provider-reported start of the quote interval.
    pub api_timestamp: PrimitiveDateTime,
    /// Provenance tag of the data provider.
    pub source: String,
    /// Full provider response, stored verbatim for replay.
    pub raw_payload: Value,
}

/// A quote row as read back from the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredQuote {
    pub record: QuoteRecord,
    /// Ingestion time assigned by the warehouse on the last write.
    pub fetched_at: OffsetDateTime,
}
