//! Asynchronous job lifecycle
//!
//! A [`Job`] tracks one background execution request from enqueue to a
//! terminal state. Transitions are guarded: once a job is `completed` or
//! `failed` it never changes again, and the engine never deletes it.

use crate::query::{QueryInput, QueryRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, waiting for its worker to start
    Queued,
    /// Worker is executing the query
    Running,
    /// Finished; `result` holds the query record
    Completed,
    /// Terminally failed; `error` holds the reason
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One tracked asynchronous execution request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque job identifier, assigned at enqueue time
    pub id: String,
    /// Submitting user; every read is scoped to this owner
    pub owner_id: String,
    /// The original query payload
    pub input: QueryInput,
    /// Lifecycle state
    pub status: JobStatus,
    /// Present only when completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryRecord>,
    /// Present only when failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last status transition
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a freshly queued job
    pub fn new(owner_id: impl Into<String>, input: QueryInput) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            input,
            status: JobStatus::Queued,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition `queued -> running`
    ///
    /// Returns false (and leaves the job untouched) from any other state.
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Running;
        self.updated_at = Utc::now();
        true
    }

    /// Transition to `completed`, embedding the executor's record
    ///
    /// Refused after a terminal state has been reached.
    pub fn complete(&mut self, result: QueryRecord) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.result = Some(result);
        self.error = None;
        self.status = JobStatus::Completed;
        self.updated_at = Utc::now();
        true
    }

    /// Transition to `failed`, embedding the executor's error
    ///
    /// Refused after a terminal state has been reached.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.error = Some(error.into());
        self.status = JobStatus::Failed;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Usage;

    fn job() -> Job {
        Job::new("u1", QueryInput::new("s1", "MSFT earnings?"))
    }

    fn completed_record(job: &Job) -> QueryRecord {
        let mut record = QueryRecord::pending(&job.owner_id, &job.input);
        record.complete("answer", "anthropic", "claude-sonnet-4-5", Usage::default());
        record
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = job();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
        assert!(!job.id.is_empty());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut job = job();
        assert!(job.start());
        assert_eq!(job.status, JobStatus::Running);

        let record = completed_record(&job);
        assert!(job.complete(record));
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
    }

    #[test]
    fn test_terminal_state_is_immutable() {
        let mut job = job();
        job.start();
        job.fail("agent timed out");
        let stamped = job.updated_at;

        assert!(!job.start());
        assert!(!job.fail("second failure"));
        let record = completed_record(&job);
        assert!(!job.complete(record));

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("agent timed out"));
        assert_eq!(job.updated_at, stamped);
    }

    #[test]
    fn test_start_requires_queued() {
        let mut job = job();
        job.start();
        assert!(!job.start());
    }
}
