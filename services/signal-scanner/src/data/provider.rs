//! History provider abstraction.
//!
//! Defines the `HistoryProvider` trait that every daily-bar source
//! implements. Providers report failures through [`ProviderError`];
//! turning those into "no data" is the job of [`super::MarketDataSource`].

use async_trait::async_trait;
use thiserror::Error;

use super::Bar;

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to history providers.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Rate limit exceeded upstream
    #[error("Rate limited by provider")]
    RateLimited,

    /// Provider answered but had no bars for the symbol
    #[error("Empty response for {0}")]
    EmptyResponse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Provider-reported error
    #[error("Provider error: {0}")]
    Provider(String),
}

impl ProviderError {
    /// Check if the error is transient (worth retrying on a later run)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited | Self::Http { status: 500..=599, .. }
        )
    }
}

// ============================================================================
// History Provider Trait
// ============================================================================

/// Trait for daily history providers.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Get the provider name (e.g., "yahoo")
    fn name(&self) -> &'static str;

    /// Fetch up to `days` most recent daily bars for a symbol, oldest first.
    ///
    /// Implementations may return fewer bars than requested.
    async fn daily_bars(&self, symbol: &str, days: usize) -> Result<Vec<Bar>, ProviderError>;
}

// ============================================================================
// Tests
// ============================================================================
