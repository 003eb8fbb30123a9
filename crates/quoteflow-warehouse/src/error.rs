use thiserror::Error;

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// Another process kept the database file locked for the whole lock wait.
    #[error("database file stayed locked for {waited_ms}ms: {source}")]
    Locked {
        waited_ms: u64,
        #[source]
        source: ::duckdb::Error,
    },

    /// I/O error (database directory creation).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The raw provider payload could not be serialized or read back.
    #[error("raw payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A timestamp could not be rendered for the statement.
    #[error("timestamp formatting failed: {0}")]
    TimestampFormat(#[from] time::error::Format),

    /// A stored row could not be mapped back into a record.
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}
