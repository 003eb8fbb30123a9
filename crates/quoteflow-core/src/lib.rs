//! # Quoteflow Core
//!
//! Intraday quote ingestion: fetch the latest quote per symbol, normalize it and
//! hand it to the warehouse.
//!
//! ## Overview
//!
//! - **Domain types** for validated symbols and intraday intervals
//! - **HTTP transport seam** so the provider can be scripted in tests
//! - **Alpha Vantage fetcher** producing complete [`QuoteRecord`]s or a typed [`FetchError`]
//! - **Run orchestrator** isolating per-symbol failures into a [`RunSummary`]
//! - **Explicit configuration** built from the environment or any key lookup
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Quote provider adapters (Alpha Vantage) |
//! | [`config`] | Run configuration and environment loading |
//! | [`domain`] | Domain types (Symbol, Interval) |
//! | [`error`] | Validation, fetch and persistence errors |
//! | [`http_client`] | HTTP client abstraction |
//! | [`pipeline`] | Run orchestrator and outcomes |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quoteflow_core::{AlphaVantageFetcher, Pipeline, PipelineConfig, ReqwestHttpClient, Warehouse};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::from_env()?;
//!     let warehouse = Warehouse::open(config.warehouse.clone())?;
//!     let fetcher = AlphaVantageFetcher::new(
//!         Arc::new(ReqwestHttpClient::new()),
//!         config.provider.clone(),
//!     );
//!
//!     let summary = Pipeline::new(config, fetcher, Arc::new(warehouse)).run().await;
//!     println!("{} of {} symbols stored", summary.succeeded(), summary.outcomes.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Trigger  │
//! └────────┬────────┘
//!          │ PipelineConfig
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │    Pipeline     │────▶│ AlphaVantage     │──▶ HttpClient
//! │  (per symbol)   │     │ Fetcher          │
//! └────────┬────────┘     └──────────────────┘
//!          │ QuoteRecord
//!          ▼
//! ┌─────────────────┐
//! │  QuoteStore     │
//! │  (Warehouse)    │
//! └─────────────────┘
//! ```
//!
//! ## Security
//!
//! - The API key is kept out of logs and `Debug` output
//! - Symbols are validated before they reach a URL
//! - Every store write is a parameterized statement

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod pipeline;

// Fetcher
pub use adapters::{normalize_quote, AlphaVantageFetcher, ALPHA_VANTAGE_SOURCE};

// Configuration
pub use config::{ConfigError, PipelineConfig, ProviderConfig};

// Domain types
pub use domain::{Interval, Symbol};

// Error types
pub use error::{FetchError, FetchErrorKind, PersistenceError, ValidationError};

// Warehouse (re-exported from quoteflow-warehouse)
pub use quoteflow_warehouse::{
    QuoteRecord, StoredQuote, Warehouse, WarehouseConfig, WarehouseError, SQL_TIMESTAMP,
};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Orchestrator
pub use pipeline::{Pipeline, QuoteStore, RunSummary, SymbolOutcome};
