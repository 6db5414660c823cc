//! Asynchronous job queue
//!
//! `enqueue` is a fast, metadata-only operation: it registers a queued job
//! and spawns the worker, never blocking on the query itself. The registry
//! is an in-memory map behind an async lock, mutated only by this queue;
//! reads are owner-scoped so one user's jobs are invisible to another.

use crate::executor::QueryExecutor;
use research_core::{Job, QueryInput, QueryStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

/// Background job queue over the query executor
pub struct JobQueue {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
    executor: Arc<QueryExecutor>,
}

impl JobQueue {
    /// Create a queue over an executor
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            executor,
        }
    }

    /// Accept a query for background execution
    ///
    /// Returns the queued job immediately; the worker transitions it to
    /// `running` and then exactly once to `completed` or `failed`.
    #[instrument(skip(self, input), fields(session_id = %input.session_id))]
    pub async fn enqueue(&self, user_id: &str, input: QueryInput) -> Job {
        let job = Job::new(user_id, input);
        let job_id = job.id.clone();
        let snapshot = job.clone();
        self.jobs.write().await.insert(job_id.clone(), job);
        info!(job_id = %job_id, "job enqueued");

        let jobs = Arc::clone(&self.jobs);
        let executor = Arc::clone(&self.executor);
        let owner = user_id.to_string();
        tokio::spawn(async move {
            Self::run_job(jobs, executor, job_id, owner).await;
        });

        snapshot
    }

    /// Read a job, scoped to its owner
    ///
    /// A job owned by someone else is indistinguishable from a missing one.
    /// After completion the returned value is an immutable snapshot, so
    /// repeated polls observe identical state.
    pub async fn get_job(&self, job_id: &str, user_id: &str) -> Option<Job> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .filter(|job| job.owner_id == user_id)
            .cloned()
    }

    /// Number of registered jobs (any status)
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn run_job(
        jobs: Arc<RwLock<HashMap<String, Job>>>,
        executor: Arc<QueryExecutor>,
        job_id: String,
        owner: String,
    ) {
        // Mark running; grab the input without holding the lock across the
        // executor call.
        let input = {
            let mut jobs = jobs.write().await;
            let Some(job) = jobs.get_mut(&job_id) else {
                error!(job_id = %job_id, "job vanished before start");
                return;
            };
            if !job.start() {
                warn!(job_id = %job_id, status = ?job.status, "refusing to start job twice");
                return;
            }
            job.input.clone()
        };

        let result = executor.execute(&owner, input).await;

        let mut jobs = jobs.write().await;
        let Some(job) = jobs.get_mut(&job_id) else {
            error!(job_id = %job_id, "job vanished before settlement");
            return;
        };
        match result {
            Ok(record) if record.status == QueryStatus::Failed => {
                let message = record
                    .error
                    .clone()
                    .unwrap_or_else(|| "query failed".to_string());
                job.fail(message);
                info!(job_id = %job_id, "job failed (recorded query failure)");
            }
            Ok(record) => {
                job.complete(record);
                info!(job_id = %job_id, "job completed");
            }
            Err(e) => {
                job.fail(e.to_string());
                error!(job_id = %job_id, error = %e, "job failed (engine error)");
            }
        }
    }
}
