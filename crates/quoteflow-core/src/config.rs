//! Run configuration.
//!
//! Everything a run needs is collected into [`PipelineConfig`] up front and handed
//! to the orchestrator. [`PipelineConfig::from_env`] reads the process
//! environment; [`PipelineConfig::from_lookup`] accepts any key lookup so tests can
//! build a configuration without touching the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ALPHA_VANTAGE_API_KEY` | required |
//! | `STOCK_SYMBOLS` | `AAPL` |
//! | `STOCK_INTERVAL` | `5min` |
//! | `ALPHA_VANTAGE_BASE_URL` | `https://www.alphavantage.co/query` |
//! | `ALPHA_VANTAGE_TIMEOUT_MS` | `10000` |
//! | `STOCKS_DB_PATH` | `data/stocks_db.duckdb` |
//! | `STOCKS_DB_TIMEOUT_MS` | `10000` |

use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use quoteflow_warehouse::WarehouseConfig;
use thiserror::Error;

use crate::Interval;

pub const API_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";
pub const SYMBOLS_VAR: &str = "STOCK_SYMBOLS";
pub const INTERVAL_VAR: &str = "STOCK_INTERVAL";
pub const BASE_URL_VAR: &str = "ALPHA_VANTAGE_BASE_URL";
pub const FETCH_TIMEOUT_VAR: &str = "ALPHA_VANTAGE_TIMEOUT_MS";
pub const DB_PATH_VAR: &str = "STOCKS_DB_PATH";
pub const STORE_TIMEOUT_VAR: &str = "STOCKS_DB_TIMEOUT_MS";

pub const DEFAULT_SYMBOLS: &str = "AAPL";
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Configuration errors. These are the only failures that stop a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be set")]
    Missing { name: &'static str },

    #[error("{name}='{value}' is invalid: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{name} does not contain any symbol")]
    NoSymbols { name: &'static str },
}

/// Quote provider settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub interval: Interval,
    pub timeout_ms: u64,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            interval: Interval::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

// Keeps the key out of `{:?}` output and therefore out of logs.
impl Debug for ProviderConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("interval", &self.interval)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Everything one run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub provider: ProviderConfig,
    /// Trimmed, non-empty entries in configured order. Not validated here so a bad
    /// ticker only costs its own slot in the run.
    pub symbols: Vec<String>,
    pub warehouse: WarehouseConfig,
    pub store_timeout_ms: u64,
}

impl PipelineConfig {
    pub fn new(provider: ProviderConfig, warehouse: WarehouseConfig) -> Self {
        Self {
            provider,
            symbols: split_symbols(DEFAULT_SYMBOLS),
            warehouse,
            store_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Replace the symbol list with the entries of a comma-separated string.
    pub fn with_symbols(mut self, raw: &str) -> Result<Self, ConfigError> {
        let symbols = split_symbols(raw);
        if symbols.is_empty() {
            return Err(ConfigError::NoSymbols { name: SYMBOLS_VAR });
        }
        self.symbols = symbols;
        Ok(self)
    }

    /// Bound each store call. The warehouse waits at most this long for a file
    /// lock held by another process.
    pub fn with_store_timeout_ms(mut self, store_timeout_ms: u64) -> Self {
        self.store_timeout_ms = store_timeout_ms;
        self.warehouse.lock_wait_ms = store_timeout_ms;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from a variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let api_key = get(API_KEY_VAR).ok_or(ConfigError::Missing { name: API_KEY_VAR })?;

        let mut provider = ProviderConfig::new(api_key);
        if let Some(base_url) = get(BASE_URL_VAR) {
            provider = provider.with_base_url(base_url);
        }
        if let Some(raw) = get(INTERVAL_VAR) {
            let interval = Interval::from_str(&raw).map_err(|error| ConfigError::Invalid {
                name: INTERVAL_VAR,
                value: raw.clone(),
                reason: error.to_string(),
            })?;
            provider = provider.with_interval(interval);
        }
        if let Some(raw) = get(FETCH_TIMEOUT_VAR) {
            provider = provider.with_timeout_ms(parse_millis(FETCH_TIMEOUT_VAR, &raw)?);
        }

        let warehouse = get(DB_PATH_VAR)
            .map(|path| WarehouseConfig::new(PathBuf::from(path)))
            .unwrap_or_default();

        let mut config = Self::new(provider, warehouse)
            .with_symbols(&get(SYMBOLS_VAR).unwrap_or_else(|| DEFAULT_SYMBOLS.to_owned()))?;
        if let Some(raw) = get(STORE_TIMEOUT_VAR) {
            config = config.with_store_timeout_ms(parse_millis(STORE_TIMEOUT_VAR, &raw)?);
        }

        Ok(config)
    }
}

/// Split a comma-separated ticker list, trimming entries and dropping blanks.
pub fn split_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|symbol| !symbol.is_empty())
        .map(str::to_owned)
        .collect()
}

fn parse_millis(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            name,
            value: raw.to_owned(),
            reason: String::from("must be greater than zero"),
        }),
        Ok(value) => Ok(value),
        Err(error) => Err(ConfigError::Invalid {
            name,
            value: raw.to_owned(),
            reason: error.to_string(),
        }),
    }
}
