use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters::AlphaVantageFetcher;
use crate::config::PipelineConfig;
use crate::{FetchError, PersistenceError, QuoteRecord, Warehouse, WarehouseError, SQL_TIMESTAMP};

/// Write side of the pipeline. Implementations block; the orchestrator moves
/// each call onto the blocking pool.
pub trait QuoteStore: Send + Sync {
    fn upsert(&self, record: &QuoteRecord) -> Result<(), WarehouseError>;
}

impl QuoteStore for Warehouse {
    fn upsert(&self, record: &QuoteRecord) -> Result<(), WarehouseError> {
        self.upsert_quote(record)
    }
}

/// Terminal state of one symbol in a run.
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SymbolOutcome {
    Succeeded {
        symbol: String,
        #[serde(serialize_with = "serialize_sql_timestamp")]
        api_timestamp: PrimitiveDateTime,
    },
    FetchFailed {
        symbol: String,
        #[serde(serialize_with = "serialize_fetch_error")]
        error: FetchError,
    },
    PersistFailed {
        symbol: String,
        #[serde(serialize_with = "serialize_persistence_error")]
        error: PersistenceError,
    },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Succeeded { symbol, .. }
            | Self::FetchFailed { symbol, .. }
            | Self::PersistFailed { symbol, .. } => symbol,
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Per-symbol outcomes of one run, in configured order.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub started_at: OffsetDateTime,
    pub elapsed_ms: u64,
    pub outcomes: Vec<SymbolOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.count(|outcome| matches!(outcome, SymbolOutcome::Succeeded { .. }))
    }

    /// Symbols whose fetch failed; no store call was made for them.
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, SymbolOutcome::FetchFailed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, SymbolOutcome::PersistFailed { .. }))
    }

    /// True when every symbol was persisted.
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(SymbolOutcome::is_success)
    }

    pub fn outcome(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.outcomes.iter().find(|outcome| outcome.symbol() == symbol)
    }

    fn count(&self, predicate: impl Fn(&SymbolOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|outcome| predicate(outcome)).count()
    }
}

/// Run orchestrator: fetch then store, one symbol at a time.
///
/// A failure is recorded against its symbol and the run moves on; nothing short of
/// a panic in the runtime ends a run early. The orchestrator never retries.
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: AlphaVantageFetcher,
    store: Arc<dyn QuoteStore>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        fetcher: AlphaVantageFetcher,
        store: Arc<dyn QuoteStore>,
    ) -> Self {
        Self {
            config,
            fetcher,
            store,
        }
    }

    pub async fn run(&self) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = OffsetDateTime::now_utc();
        let clock = Instant::now();

        let outcomes = async {
            let symbols: Vec<&str> = self
                .config
                .symbols
                .iter()
                .map(|symbol| symbol.trim())
                .filter(|symbol| !symbol.is_empty())
                .collect();
            info!(symbols = symbols.len(), "run started");

            let mut outcomes = Vec::with_capacity(symbols.len());
            for symbol in symbols {
                outcomes.push(self.process(symbol).await);
            }
            outcomes
        }
        .instrument(info_span!("run", %run_id))
        .await;

        let summary = RunSummary {
            run_id,
            started_at,
            elapsed_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            outcomes,
        };

        info!(
            %run_id,
            succeeded = summary.succeeded(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            elapsed_ms = summary.elapsed_ms,
            "run finished"
        );
        summary
    }

    async fn process(&self, raw_symbol: &str) -> SymbolOutcome {
        let record = match self.fetcher.fetch(raw_symbol).await {
            Ok(record) => record,
            Err(error) => {
                warn!(
                    symbol = error.symbol(),
                    error_code = error.code(),
                    retryable = error.retryable(),
                    %error,
                    "fetch failed, symbol skipped"
                );
                return SymbolOutcome::FetchFailed {
                    symbol: error.symbol().to_owned(),
                    error,
                };
            }
        };

        let symbol = record.symbol.clone();
        match self.persist(record).await {
            Ok(api_timestamp) => {
                info!(symbol = %symbol, api_timestamp = %api_timestamp, "quote persisted");
                SymbolOutcome::Succeeded {
                    symbol,
                    api_timestamp,
                }
            }
            Err(error) => {
                warn!(
                    symbol = %symbol,
                    error_code = error.code(),
                    %error,
                    "persist failed"
                );
                SymbolOutcome::PersistFailed { symbol, error }
            }
        }
    }

    /// Upsert on the blocking pool, bounded by `store_timeout_ms`.
    ///
    /// An elapsed timeout abandons the blocking task; it may still commit later and
    /// keeps the database file open until it finishes. Its wait for a lock held by
    /// another process is bounded by the same timeout.
    async fn persist(&self, record: QuoteRecord) -> Result<PrimitiveDateTime, PersistenceError> {
        let symbol = record.symbol.clone();
        let api_timestamp = record.api_timestamp;
        let timeout_ms = self.config.store_timeout_ms;
        let store = Arc::clone(&self.store);

        let task = tokio::task::spawn_blocking(move || store.upsert(&record));
        match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
            Ok(Ok(Ok(()))) => Ok(api_timestamp),
            Ok(Ok(Err(source))) => Err(PersistenceError::Store { symbol, source }),
            Ok(Err(join_error)) => Err(PersistenceError::Aborted {
                symbol,
                message: join_error.to_string(),
            }),
            Err(_) => Err(PersistenceError::Timeout { symbol, timeout_ms }),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

fn serialize_fetch_error<S>(error: &FetchError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    ErrorBody {
        code: error.code(),
        message: error.to_string(),
    }
    .serialize(serializer)
}

fn serialize_persistence_error<S>(
    error: &PersistenceError,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    ErrorBody {
        code: error.code(),
        message: error.to_string(),
    }
    .serialize(serializer)
}

fn serialize_sql_timestamp<S>(value: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let formatted = value
        .format(SQL_TIMESTAMP)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

fn serialize_rfc3339<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn summary(outcomes: Vec<SymbolOutcome>) -> RunSummary {
        RunSummary {
            run_id: Uuid::nil(),
            started_at: OffsetDateTime::UNIX_EPOCH,
            elapsed_ms: 12,
            outcomes,
        }
    }

    #[test]
    fn outcomes_serialize_with_state_tag_and_error_code() {
        let report = summary(vec![
            SymbolOutcome::Succeeded {
                symbol: String::from("AAPL"),
                api_timestamp: datetime!(2026-02-20 15:55:00),
            },
            SymbolOutcome::FetchFailed {
                symbol: String::from("MSFT"),
                error: FetchError::Status {
                    symbol: String::from("MSFT"),
                    status: 500,
                },
            },
        ]);

        let value = serde_json::to_value(&report).expect("serialize");

        assert_eq!(value["started_at"], json!("1970-01-01T00:00:00Z"));
        assert_eq!(
            value["outcomes"][0],
            json!({"state": "succeeded", "symbol": "AAPL", "api_timestamp": "2026-02-20 15:55:00"})
        );
        assert_eq!(value["outcomes"][1]["state"], json!("fetch_failed"));
        assert_eq!(value["outcomes"][1]["error"]["code"], json!("fetch.failure"));
    }

    #[test]
    fn counters_partition_the_outcomes() {
        let report = summary(vec![
            SymbolOutcome::Succeeded {
                symbol: String::from("AAPL"),
                api_timestamp: datetime!(2026-02-20 16:00:00),
            },
            SymbolOutcome::PersistFailed {
                symbol: String::from("GOOGL"),
                error: PersistenceError::Timeout {
                    symbol: String::from("GOOGL"),
                    timeout_ms: 50,
                },
            },
        ]);

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.skipped(), 0);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_clean());
        assert!(report.outcome("GOOGL").is_some_and(|outcome| !outcome.is_success()));
    }
}
