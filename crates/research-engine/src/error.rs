//! Error taxonomy for the query-execution engine

use crate::agent::AgentError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The budget cap an admission decision ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapKind {
    Daily,
    Monthly,
    Session,
    PerQuery,
}

impl std::fmt::Display for CapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Session => "session",
            Self::PerQuery => "per_query",
        };
        write!(f, "{label}")
    }
}

/// Errors surfaced by the engine's entry points
///
/// `BudgetExceeded` and `Agent` are terminal for a query and end up recorded
/// into the failed record/job rather than propagating; `Storage` is the only
/// variant execution paths raise as a hard error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Admission denied; names the breached cap
    #[error("budget exceeded: {cap} cap of {limit:.4} would be breached (projected {projected:.4})")]
    BudgetExceeded {
        cap: CapKind,
        limit: f64,
        projected: f64,
    },

    /// The answering capability failed or timed out
    #[error("agent failed: {0}")]
    Agent(#[from] AgentError),

    /// Job or resource absent, or not owned by the caller
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input, rejected before execution
    #[error("invalid request: {0}")]
    Validation(String),

    /// The durable store misbehaved
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
