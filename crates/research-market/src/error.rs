//! Error types for market-data operations

use thiserror::Error;

/// Market-data specific errors
#[derive(Debug, Error)]
pub enum MarketError {
    /// Upstream API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Invalid ticker symbol provided
    #[error("invalid ticker: {0}")]
    InvalidTicker(String),

    /// Data not available for the requested ticker
    #[error("data not available for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    /// Rate limit exceeded for an upstream API
    #[error("rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Network or HTTP error
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for market-data operations
pub type Result<T> = std::result::Result<T, MarketError>;
