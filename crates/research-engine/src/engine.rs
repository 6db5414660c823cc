//! Engine facade: the five operations the transport layer wraps
//!
//! Input validation happens here, before the executor is ever invoked;
//! rejected input mutates nothing. Everything below the facade trusts the
//! resolved `user_id` it is handed.

use crate::agent::AgentAdapter;
use crate::budget::{BudgetLedger, BudgetPatch, BudgetSettings, BudgetSnapshot};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::executor::QueryExecutor;
use crate::queue::JobQueue;
use crate::store::QueryStore;
use research_core::{Job, QueryInput, QueryRecord};
use research_market::EnrichmentPipeline;
use std::sync::Arc;

/// The query-execution engine
pub struct QueryEngine {
    executor: Arc<QueryExecutor>,
    queue: JobQueue,
    ledger: Arc<BudgetLedger>,
    store: Arc<dyn QueryStore>,
    config: Arc<EngineConfig>,
}

impl QueryEngine {
    /// Wire an engine from its collaborators
    pub fn new(
        adapter: Arc<AgentAdapter>,
        pipeline: Arc<EnrichmentPipeline>,
        store: Arc<dyn QueryStore>,
        config: Arc<EngineConfig>,
        budget_defaults: BudgetSettings,
    ) -> Self {
        let ledger = Arc::new(BudgetLedger::new(budget_defaults));
        let executor = Arc::new(QueryExecutor::new(
            Arc::clone(&ledger),
            adapter,
            pipeline,
            Arc::clone(&store),
            Arc::clone(&config),
        ));
        let queue = JobQueue::new(Arc::clone(&executor));

        Self {
            executor,
            queue,
            ledger,
            store,
            config,
        }
    }

    /// Execute a query synchronously on the caller's own unit of work
    pub async fn execute_query(&self, user_id: &str, input: QueryInput) -> Result<QueryRecord> {
        self.validate(&input)?;
        self.executor.execute(user_id, input).await
    }

    /// Submit a query for background execution
    pub async fn enqueue_query(&self, user_id: &str, input: QueryInput) -> Result<Job> {
        self.validate(&input)?;
        Ok(self.queue.enqueue(user_id, input).await)
    }

    /// Poll a job, scoped to its owner
    ///
    /// A foreign user's job reads as `NotFound`; its existence never leaks.
    pub async fn get_job(&self, job_id: &str, user_id: &str) -> Result<Job> {
        self.queue
            .get_job(job_id, user_id)
            .await
            .ok_or_else(|| EngineError::NotFound(format!("job {job_id}")))
    }

    /// Read a user's budget state
    pub async fn budget_snapshot(
        &self,
        user_id: &str,
        session_id: Option<&str>,
    ) -> BudgetSnapshot {
        self.ledger.snapshot(user_id, session_id).await
    }

    /// Update a user's budget caps
    pub async fn update_budget_settings(
        &self,
        user_id: &str,
        patch: BudgetPatch,
    ) -> Result<BudgetSnapshot> {
        self.ledger.update_settings(user_id, patch).await
    }

    /// Read a persisted query record by id
    pub async fn get_query_record(&self, record_id: &str) -> Result<Option<QueryRecord>> {
        self.store.get_record(record_id).await
    }

    fn validate(&self, input: &QueryInput) -> Result<()> {
        if input.session_id.trim().is_empty() {
            return Err(EngineError::Validation(
                "session_id must not be empty".to_string(),
            ));
        }
        let question = input.question.trim();
        if question.is_empty() {
            return Err(EngineError::Validation(
                "question must not be empty".to_string(),
            ));
        }
        if question.chars().count() > self.config.max_question_chars {
            return Err(EngineError::Validation(format!(
                "question exceeds {} characters",
                self.config.max_question_chars
            )));
        }
        Ok(())
    }
}
