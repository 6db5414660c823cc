//! Query input and the durable query record
//!
//! A [`QueryRecord`] is the persisted result of one answered research
//! question, whether it ran synchronously or inside a job. Its lifecycle is
//! `pending -> completed | failed`; the terminal transition is the only
//! writer of `response`, `error`, and `usage`.

use crate::artifact::ArtifactBag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-selection mode for a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Let the engine pick a model and fall back when it fails
    #[default]
    Auto,
    /// Pin the cheaper, faster model
    Fast,
    /// Pin the strongest model
    Deep,
}

/// Requested answer verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// A few sentences
    Brief,
    /// The default length
    #[default]
    Standard,
    /// A long-form answer
    Detailed,
}

/// One research question as submitted by a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInput {
    /// Session the query belongs to
    pub session_id: String,
    /// The natural-language question
    pub question: String,
    /// Provider-selection mode
    #[serde(default)]
    pub mode: QueryMode,
    /// Requested verbosity
    #[serde(default)]
    pub verbosity: Verbosity,
}

impl QueryInput {
    /// Create an input with default mode and verbosity
    pub fn new(session_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            question: question.into(),
            mode: QueryMode::default(),
            verbosity: Verbosity::default(),
        }
    }

    /// Set the provider-selection mode
    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the verbosity
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// Lifecycle state of a query record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// Execution in flight
    Pending,
    /// Answered; `response` is set and `error` is empty
    Completed,
    /// Terminally failed; `error` is set
    Failed,
}

/// Spend split across the engine's cost centers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Cost of the answering capability (token-priced)
    pub agent: f64,
    /// Cost of market-data enrichment
    pub data: f64,
    /// Cost of capability-reported search billing
    pub search: f64,
}

impl CostBreakdown {
    /// Cost with only the agent center set
    pub fn agent_only(agent: f64) -> Self {
        Self {
            agent,
            ..Self::default()
        }
    }

    /// Total spend across all cost centers
    pub fn total(&self) -> f64 {
        self.agent + self.data + self.search
    }
}

/// Token counts and cost for one executed query
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of input tokens
    pub input_tokens: usize,
    /// Number of output tokens
    pub output_tokens: usize,
    /// Spend breakdown
    pub cost: CostBreakdown,
}

impl Usage {
    /// Total tokens used (input + output)
    pub fn total_tokens(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

/// The durable result of one executed query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Opaque record identifier
    pub id: String,
    /// Submitting user
    pub user_id: String,
    /// Session the query ran under
    pub session_id: String,
    /// The original question
    pub question: String,
    /// Answer text; set only on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Lifecycle state
    pub status: QueryStatus,
    /// Failure description; set only on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Provider label of the capability that answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Model label of the capability that answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Usage, written once by the terminal transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Enrichment fragments attached to the answer
    #[serde(default, skip_serializing_if = "ArtifactBag::is_empty")]
    pub artifacts: ArtifactBag,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last status transition
    pub updated_at: DateTime<Utc>,
}

impl QueryRecord {
    /// Create a pending record for a freshly admitted query
    pub fn pending(user_id: impl Into<String>, input: &QueryInput) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            session_id: input.session_id.clone(),
            question: input.question.clone(),
            response: None,
            status: QueryStatus::Pending,
            error: None,
            provider: None,
            model: None,
            usage: None,
            artifacts: ArtifactBag::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to `completed` with the answer and its usage
    ///
    /// Clears any error and stamps `updated_at`. Usage is written here and
    /// never again.
    pub fn complete(
        &mut self,
        response: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        usage: Usage,
    ) {
        self.response = Some(response.into());
        self.provider = Some(provider.into());
        self.model = Some(model.into());
        self.usage = Some(usage);
        self.error = None;
        self.status = QueryStatus::Completed;
        self.updated_at = Utc::now();
    }

    /// Transition to `failed` with a human-readable reason
    ///
    /// `usage` is the partial usage the capability reported before failing,
    /// when it reported any.
    pub fn fail(&mut self, error: impl Into<String>, usage: Option<Usage>) {
        self.error = Some(error.into());
        if usage.is_some() {
            self.usage = usage;
        }
        self.status = QueryStatus::Failed;
        self.updated_at = Utc::now();
    }

    /// Whether the record reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, QueryStatus::Completed | QueryStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> QueryInput {
        QueryInput::new("s1", "AAPL outlook")
    }

    #[test]
    fn test_pending_record() {
        let record = QueryRecord::pending("u1", &input());
        assert_eq!(record.status, QueryStatus::Pending);
        assert!(record.response.is_none());
        assert!(record.error.is_none());
        assert!(record.usage.is_none());
        assert!(!record.is_terminal());
    }

    #[test]
    fn test_complete_sets_response_and_clears_error() {
        let mut record = QueryRecord::pending("u1", &input());
        record.complete("answer", "anthropic", "claude-sonnet-4-5", Usage::default());

        assert_eq!(record.status, QueryStatus::Completed);
        assert_eq!(record.response.as_deref(), Some("answer"));
        assert!(record.error.is_none());
        assert!(record.usage.is_some());
        assert!(record.is_terminal());
    }

    #[test]
    fn test_fail_sets_error() {
        let mut record = QueryRecord::pending("u1", &input());
        record.fail("agent unreachable", None);

        assert_eq!(record.status, QueryStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("agent unreachable"));
        assert!(record.usage.is_none());
    }

    #[test]
    fn test_fail_keeps_partial_usage() {
        let mut record = QueryRecord::pending("u1", &input());
        let partial = Usage {
            input_tokens: 120,
            output_tokens: 0,
            cost: CostBreakdown::agent_only(0.01),
        };
        record.fail("empty completion", Some(partial));

        assert_eq!(record.usage, Some(partial));
    }

    #[test]
    fn test_cost_total() {
        let cost = CostBreakdown {
            agent: 0.5,
            data: 0.02,
            search: 0.0,
        };
        assert!((cost.total() - 0.52).abs() < f64::EPSILON);
    }

    #[test]
    fn test_input_defaults() {
        let input = input();
        assert_eq!(input.mode, QueryMode::Auto);
        assert_eq!(input.verbosity, Verbosity::Standard);
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&QueryMode::Deep).unwrap();
        assert_eq!(json, "\"deep\"");
    }
}
