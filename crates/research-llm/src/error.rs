//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur while talking to an LLM service
#[derive(Error, Debug)]
pub enum LLMError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit exceeded
    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The request was rejected as malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[cfg(any(feature = "anthropic", feature = "openai"))]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Response arrived but could not be understood
    #[error("unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Provider configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
