//! Market data module.
//!
//! Daily bar storage, the provider seam, and the rate-limited access path
//! that every history request goes through.
//!
//! # Data Sources
//! - **Yahoo Finance** chart API (default provider)
//!
//! Any other source can be plugged in by implementing [`HistoryProvider`];
//! [`MarketDataSource`] keeps the empty-on-failure contract on top of it.

mod fields;
mod frame;
mod provider;
mod rate_limiter;
mod source;
mod stats;
mod yahoo;

pub use fields::FieldKey;
pub use frame::{ColumnLengthError, HistoryFrame};
pub use provider::{HistoryProvider, ProviderError};
pub use rate_limiter::{shared_limiter, RateLimiter, SharedRateLimiter};
pub use source::MarketDataSource;
pub use stats::{RequestStats, StatsSummary};
pub use yahoo::YahooFinanceAdapter;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Data Types
// ============================================================================

/// A single daily bar (OHLCV).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading date
    pub date: NaiveDate,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume (shares)
    pub volume: f64,
}
