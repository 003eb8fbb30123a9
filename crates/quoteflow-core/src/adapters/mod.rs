//! Quote provider adapters.

pub mod alphavantage;

pub use alphavantage::{normalize_quote, AlphaVantageFetcher, ALPHA_VANTAGE_SOURCE};
