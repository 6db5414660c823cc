//! Error types for research-core

use thiserror::Error;

/// Result type alias for research-core
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error type for core model operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Context value could not be (de)serialized
    #[error("context value error: {0}")]
    ContextValue(#[from] serde_json::Error),
}
