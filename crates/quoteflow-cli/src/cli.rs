//! CLI argument definitions for quoteflow.
//!
//! A run needs no arguments: everything comes from the environment (see
//! `quoteflow_core::config`). The flags below only override or extend it.
//!
//! # Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--symbols` | `$STOCK_SYMBOLS` | Comma-separated tickers |
//! | `--db-path` | `$STOCKS_DB_PATH` | DuckDB database file |
//! | `--init-schema` | `false` | Create `stock_prices` before the run |
//! | `--summary` | `false` | Print the run summary as JSON |
//! | `--pretty` | `false` | Pretty-print the summary (implies `--summary`) |
//! | `--strict` | `false` | Exit 3 when any symbol was not stored |
//! | `--log-format` | `text` | Log line format (text, json) |
//!
//! # Examples
//!
//! ```bash
//! # Scheduled run, configuration from the environment
//! quoteflow
//!
//! # First run against a fresh database file
//! quoteflow --init-schema --db-path /var/lib/quoteflow/stocks.duckdb
//!
//! # Let the scheduler see per-symbol failures
//! quoteflow --strict --log-format json
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Intraday quote ingestion into a local DuckDB warehouse.
///
/// Fetches the latest Alpha Vantage intraday quote for each configured symbol and
/// upserts it into `stock_prices`. Per-symbol failures are logged and do not stop
/// the run.
#[derive(Debug, Parser)]
#[command(
    name = "quoteflow",
    author,
    version,
    about = "Intraday quote ingestion into DuckDB"
)]
pub struct Cli {
    /// Comma-separated ticker list; overrides STOCK_SYMBOLS.
    #[arg(long, value_name = "LIST")]
    pub symbols: Option<String>,

    /// DuckDB database file; overrides STOCKS_DB_PATH.
    #[arg(long, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Apply the schema bootstrap before the run.
    #[arg(long, default_value_t = false)]
    pub init_schema: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long, default_value_t = false)]
    pub summary: bool,

    /// Pretty-print the JSON summary with indentation.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// Exit with code 3 when any symbol was skipped or failed to persist.
    ///
    /// Without it the exit code is 0 whatever the per-symbol outcomes.
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Log line format.
    #[arg(
        long,
        value_enum,
        env = "QUOTEFLOW_LOG_FORMAT",
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}
