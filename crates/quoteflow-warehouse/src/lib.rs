//! # Quoteflow Warehouse
//!
//! DuckDB-backed quote store for quoteflow.
//!
//! ## Overview
//!
//! The warehouse persists normalized intraday quotes into the `stock_prices`
//! table. The only write path is a single parameterized
//! `INSERT ... ON CONFLICT (symbol, api_timestamp) DO UPDATE` statement run in
//! its own transaction, so re-delivering a quote (a retried run, or two runs
//! overlapping) converges on one row per natural key instead of duplicating it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quoteflow_warehouse::{Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::new("data/stocks_db.duckdb"))?;
//!     warehouse.ensure_schema()?;
//!     println!("AAPL rows: {}", warehouse.count_quotes("AAPL")?);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `stock_prices` | One row per `(symbol, api_timestamp)` |
//! | `schema_migrations` | Applied bootstrap migrations |

pub mod duckdb;
mod error;
pub mod migrations;
mod models;

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use ::duckdb::{Connection, OptionalExt, ToSql};
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

pub use duckdb::ScopedConnection;
pub use error::WarehouseError;
pub use models::{QuoteRecord, StoredQuote, SQL_TIMESTAMP};

use models::SQL_TIMESTAMP_MICROS;

const DEFAULT_DB_PATH: &str = "data/stocks_db.duckdb";
const DEFAULT_LOCK_WAIT_MS: u64 = 10_000;
const LOCK_BACKOFF_START: Duration = Duration::from_millis(10);
const LOCK_BACKOFF_MAX: Duration = Duration::from_millis(250);

const UPSERT_QUOTE_SQL: &str = "\
INSERT INTO stock_prices \
 (symbol, price, open_price, high_price, low_price, close_price, volume, api_timestamp, source, raw_payload, fetched_at) \
 VALUES (?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), ?, ?, CAST(? AS TIMESTAMP)) \
ON CONFLICT (symbol, api_timestamp) DO UPDATE SET \
 price = EXCLUDED.price, \
 open_price = EXCLUDED.open_price, \
 high_price = EXCLUDED.high_price, \
 low_price = EXCLUDED.low_price, \
 close_price = EXCLUDED.close_price, \
 volume = EXCLUDED.volume, \
 source = EXCLUDED.source, \
 raw_payload = EXCLUDED.raw_payload, \
 fetched_at = EXCLUDED.fetched_at";

const LOAD_QUOTE_SQL: &str = "\
SELECT symbol, CAST(price AS DOUBLE), CAST(open_price AS DOUBLE), CAST(high_price AS DOUBLE), \
 CAST(low_price AS DOUBLE), CAST(close_price AS DOUBLE), volume, \
 strftime(api_timestamp, '%Y-%m-%d %H:%M:%S'), source, raw_payload, epoch_us(fetched_at) \
FROM stock_prices \
WHERE symbol = ? AND api_timestamp = CAST(? AS TIMESTAMP)";

/// Configuration for the warehouse database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// How long a call waits for another process to release the database file.
    pub lock_wait_ms: u64,
}

impl WarehouseConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            lock_wait_ms: DEFAULT_LOCK_WAIT_MS,
        }
    }

    pub fn with_lock_wait_ms(mut self, lock_wait_ms: u64) -> Self {
        self.lock_wait_ms = lock_wait_ms;
        self
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DB_PATH)
    }
}

/// The quote store. Holds no open connection between calls.
#[derive(Debug, Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
}

impl Warehouse {
    /// Prepare a warehouse for the configured database file.
    ///
    /// Creates the parent directory; the database file itself is created by the
    /// first connection. The schema is not touched, see [`Warehouse::ensure_schema`].
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        Ok(Self { config })
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.config.db_path.as_path()
    }

    /// Apply the bootstrap migrations that create `stock_prices`.
    pub fn ensure_schema(&self) -> Result<(), WarehouseError> {
        let connection = self.connect()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Insert a quote, or overwrite the row that already holds its natural key.
    ///
    /// On conflict every value column (`price` through `raw_payload`) is replaced
    /// and `fetched_at` is refreshed; `symbol` and `api_timestamp` are left as is.
    /// Applying the same record repeatedly leaves one row that differs only in
    /// `fetched_at`.
    ///
    /// # Security
    /// All record values are passed as statement parameters.
    pub fn upsert_quote(&self, record: &QuoteRecord) -> Result<(), WarehouseError> {
        let api_timestamp = record.api_timestamp.format(SQL_TIMESTAMP)?;
        let raw_payload = serde_json::to_string(&record.raw_payload)?;
        let fetched_at = OffsetDateTime::now_utc().format(SQL_TIMESTAMP_MICROS)?;

        let connection = self.connect()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let params: [&dyn ToSql; 11] = [
                &record.symbol,
                &record.price,
                &record.open_price,
                &record.high_price,
                &record.low_price,
                &record.close_price,
                &record.volume,
                &api_timestamp,
                &record.source,
                &raw_payload,
                &fetched_at,
            ];
            Ok(connection.execute(UPSERT_QUOTE_SQL, params.as_slice())?)
        })();

        let changed = finalize_transaction(&connection, result)?;
        debug!(
            symbol = %record.symbol,
            api_timestamp = %api_timestamp,
            changed,
            "quote upserted"
        );
        Ok(())
    }

    /// Load the stored row for a natural key, if any.
    pub fn load_quote(
        &self,
        symbol: &str,
        api_timestamp: PrimitiveDateTime,
    ) -> Result<Option<StoredQuote>, WarehouseError> {
        let api_timestamp = api_timestamp.format(SQL_TIMESTAMP)?;
        let connection = self.connect()?;
        let params: [&dyn ToSql; 2] = [&symbol, &api_timestamp];

        let row = connection
            .query_row(LOAD_QUOTE_SQL, params.as_slice(), |row| {
                Ok(StoredRow {
                    symbol: row.get(0)?,
                    price: row.get(1)?,
                    open_price: row.get(2)?,
                    high_price: row.get(3)?,
                    low_price: row.get(4)?,
                    close_price: row.get(5)?,
                    volume: row.get(6)?,
                    api_timestamp: row.get(7)?,
                    source: row.get(8)?,
                    raw_payload: row.get(9)?,
                    fetched_at_us: row.get(10)?,
                })
            })
            .optional()?;

        row.map(StoredRow::into_stored_quote).transpose()
    }

    /// Number of stored rows for a symbol across all quote timestamps.
    pub fn count_quotes(&self, symbol: &str) -> Result<u64, WarehouseError> {
        let connection = self.connect()?;
        let count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM stock_prices WHERE symbol = ?",
            [symbol],
            |row| row.get(0),
        )?;
        u64::try_from(count).map_err(|_| WarehouseError::InvalidData(format!("negative count {count}")))
    }

    /// Open a connection, waiting while another process holds the database file.
    ///
    /// `DuckDB` admits a single read-write process per file. An overlapping writer
    /// backs off and retries the open until `lock_wait_ms` has passed, so its
    /// upsert lands after the other write instead of being dropped.
    fn connect(&self) -> Result<ScopedConnection, WarehouseError> {
        let started = Instant::now();
        let limit = Duration::from_millis(self.config.lock_wait_ms);
        let mut backoff = LOCK_BACKOFF_START;

        loop {
            let source = match ScopedConnection::open(self.db_path()) {
                Ok(connection) => return Ok(connection),
                Err(error) if duckdb::is_lock_conflict(&error) => error,
                Err(error) => return Err(error.into()),
            };

            let waited = started.elapsed();
            if waited >= limit {
                return Err(WarehouseError::Locked {
                    waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                    source,
                });
            }

            debug!(
                path = %self.db_path().display(),
                ?backoff,
                "database file is locked by another process, waiting"
            );
            thread::sleep(backoff.min(limit - waited));
            backoff = (backoff * 2).min(LOCK_BACKOFF_MAX);
        }
    }
}

/// Raw column values of a `stock_prices` row before conversion.
struct StoredRow {
    symbol: String,
    price: f64,
    open_price: f64,
    high_price: f64,
    low_price: f64,
    close_price: f64,
    volume: u64,
    api_timestamp: String,
    source: String,
    raw_payload: String,
    fetched_at_us: i64,
}

impl StoredRow {
    fn into_stored_quote(self) -> Result<StoredQuote, WarehouseError> {
        let api_timestamp = PrimitiveDateTime::parse(&self.api_timestamp, SQL_TIMESTAMP)
            .map_err(|error| {
                WarehouseError::InvalidData(format!(
                    "api_timestamp '{}' is unreadable: {error}",
                    self.api_timestamp
                ))
            })?;
        let fetched_at =
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.fetched_at_us) * 1_000)
                .map_err(|error| {
                    WarehouseError::InvalidData(format!("fetched_at is out of range: {error}"))
                })?;

        Ok(StoredQuote {
            record: QuoteRecord {
                symbol: self.symbol,
                price: self.price,
                open_price: self.open_price,
                high_price: self.high_price,
                low_price: self.low_price,
                close_price: self.close_price,
                volume: self.volume,
                api_timestamp,
                source: self.source,
                raw_payload: serde_json::from_str(&self.raw_payload)?,
            },
            fetched_at,
        })
    }
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}
