use serde::Serialize;
use thiserror::Error;

use quoteflow_warehouse::WarehouseError;

/// Validation errors for domain inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid interval '{value}', expected one of 1min, 5min, 15min, 30min, 60min")]
    InvalidInterval { value: String },
}

/// Failure category of a quote fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    InvalidSymbol,
    FetchFailure,
    SchemaMismatch,
    FieldCoercion,
    TimestampParse,
}

/// Why a quote could not be produced for a symbol.
///
/// A fetch either yields a complete record or one of these; nothing in between.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("symbol '{input}' is invalid: {source}")]
    InvalidSymbol {
        input: String,
        #[source]
        source: ValidationError,
    },

    #[error("quote request for {symbol} failed: {message}")]
    Transport { symbol: String, message: String },

    #[error("quote provider returned status {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("unexpected quote response for {symbol}: {detail}")]
    SchemaMismatch { symbol: String, detail: String },

    #[error("field '{field}' of {symbol} at {timestamp} is not usable: {detail}")]
    FieldCoercion {
        symbol: String,
        timestamp: String,
        field: &'static str,
        detail: String,
    },

    #[error("timestamp '{value}' for {symbol} does not match the provider format")]
    TimestampParse { symbol: String, value: String },
}

impl FetchError {
    pub const fn kind(&self) -> FetchErrorKind {
        match self {
            Self::InvalidSymbol { .. } => FetchErrorKind::InvalidSymbol,
            Self::Transport { .. } | Self::Status { .. } => FetchErrorKind::FetchFailure,
            Self::SchemaMismatch { .. } => FetchErrorKind::SchemaMismatch,
            Self::FieldCoercion { .. } => FetchErrorKind::FieldCoercion,
            Self::TimestampParse { .. } => FetchErrorKind::TimestampParse,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self.kind() {
            FetchErrorKind::InvalidSymbol => "fetch.invalid_symbol",
            FetchErrorKind::FetchFailure => "fetch.failure",
            FetchErrorKind::SchemaMismatch => "fetch.schema_mismatch",
            FetchErrorKind::FieldCoercion => "fetch.field_coercion",
            FetchErrorKind::TimestampParse => "fetch.timestamp_parse",
        }
    }

    /// Only transport-level failures are worth another attempt on a later run.
    pub const fn retryable(&self) -> bool {
        matches!(self.kind(), FetchErrorKind::FetchFailure)
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::InvalidSymbol { input, .. } => input,
            Self::Transport { symbol, .. }
            | Self::Status { symbol, .. }
            | Self::SchemaMismatch { symbol, .. }
            | Self::FieldCoercion { symbol, .. }
            | Self::TimestampParse { symbol, .. } => symbol,
        }
    }
}

/// Why a fetched quote could not be stored.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to persist {symbol}: {source}")]
    Store {
        symbol: String,
        #[source]
        source: WarehouseError,
    },

    #[error("store call for {symbol} timed out after {timeout_ms}ms")]
    Timeout { symbol: String, timeout_ms: u64 },

    #[error("store task for {symbol} aborted: {message}")]
    Aborted { symbol: String, message: String },
}

impl PersistenceError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Store { .. } => "persist.store",
            Self::Timeout { .. } => "persist.timeout",
            Self::Aborted { .. } => "persist.aborted",
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::Store { symbol, .. }
            | Self::Timeout { symbol, .. }
            | Self::Aborted { symbol, .. } => symbol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_are_retryable() {
        let transport = FetchError::Status {
            symbol: String::from("MSFT"),
            status: 500,
        };
        let schema = FetchError::SchemaMismatch {
            symbol: String::from("MSFT"),
            detail: String::from("missing 'Time Series (5min)'"),
        };

        assert_eq!(transport.kind(), FetchErrorKind::FetchFailure);
        assert!(transport.retryable());
        assert_eq!(schema.code(), "fetch.schema_mismatch");
        assert!(!schema.retryable());
    }

    #[test]
    fn persistence_error_names_the_symbol() {
        let error = PersistenceError::Timeout {
            symbol: String::from("AAPL"),
            timeout_ms: 250,
        };
        assert_eq!(error.symbol(), "AAPL");
        assert!(error.to_string().contains("AAPL"));
    }
}
