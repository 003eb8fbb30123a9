use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] quoteflow_core::ConfigError),

    #[error("strict mode failed: skipped={skipped}, failed={failed}")]
    StrictModeViolation { skipped: usize, failed: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("warehouse error: {0}")]
    Warehouse(#[from] quoteflow_core::WarehouseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::StrictModeViolation { .. } => 3,
            Self::Serialization(_) => 4,
            Self::Warehouse(_) | Self::Io(_) => 10,
        }
    }
}
