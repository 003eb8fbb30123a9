//! # Domain Types
//!
//! Validated inputs of the ingestion pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Trimmed, uppercase ticker |
//! | [`Interval`] | Intraday bucket requested from the provider |
//!
//! The normalized quote itself is [`QuoteRecord`](crate::QuoteRecord), owned by
//! the warehouse crate because it is the persisted row shape.

mod interval;
mod symbol;

pub use interval::Interval;
pub use symbol::Symbol;
