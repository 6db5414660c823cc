//! Query executor: one research question, end to end
//!
//! Per invocation the executor walks admitting -> executing -> enriching ->
//! settling, collapsing to a single failed exit from any phase. Exactly one
//! terminal persistence write happens per invocation, and the budget ledger
//! is touched at most twice: a side-effect-free admission check up front and
//! one settlement after the work is done.

use crate::agent::AgentAdapter;
use crate::budget::{Admission, BudgetLedger};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::store::QueryStore;
use research_core::{QueryInput, QueryMode, QueryRecord, SessionContext, Verbosity};
use research_market::{EnrichmentPipeline, EnrichmentProfile, extract_tickers};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Orchestrates one query end-to-end
pub struct QueryExecutor {
    ledger: Arc<BudgetLedger>,
    adapter: Arc<AgentAdapter>,
    pipeline: Arc<EnrichmentPipeline>,
    store: Arc<dyn QueryStore>,
    config: Arc<EngineConfig>,
}

impl QueryExecutor {
    /// Create an executor over its collaborators
    pub fn new(
        ledger: Arc<BudgetLedger>,
        adapter: Arc<AgentAdapter>,
        pipeline: Arc<EnrichmentPipeline>,
        store: Arc<dyn QueryStore>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            ledger,
            adapter,
            pipeline,
            store,
            config,
        }
    }

    /// Execute one query for a user
    ///
    /// Budget denials and agent failures return an `Ok` record with
    /// `status = failed`; only storage faults surface as `Err`.
    #[instrument(skip(self, input), fields(session_id = %input.session_id))]
    pub async fn execute(&self, user_id: &str, input: QueryInput) -> Result<QueryRecord> {
        let mut record = QueryRecord::pending(user_id, &input);

        // admitting
        let estimated = self.adapter.estimate_cost(input.mode, input.verbosity);
        debug!(estimated, "admission check");
        if let Admission::Denied(cap) = self
            .ledger
            .check_admission(user_id, &input.session_id, estimated)
            .await
        {
            info!(%cap, estimated, "query denied by budget");
            record.fail(
                format!("budget exceeded: {cap} cap would be breached"),
                None,
            );
            self.store.save_record(&record).await?;
            return Ok(record);
        }

        // executing
        let session = self.store.load_session(&input.session_id).await?;
        let mut ctx = SessionContext::new()
            .with_user_id(user_id)
            .with_session_id(&input.session_id)
            .with_mode(input.mode)
            .with_verbosity(input.verbosity);
        if let Some(session) = session {
            if let Some(title) = session.title {
                ctx = ctx.with_session_title(title);
            }
        }

        let outcome = match self.adapter.run(&input.question, &ctx).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                info!(error = %failure.error, "agent failed, recording terminal failure");
                // bill exactly the partial usage the capability reported
                if let Some(partial) = failure.partial_usage {
                    self.ledger
                        .record_usage(user_id, &input.session_id, partial.cost.total())
                        .await;
                }
                record.fail(failure.error.to_string(), failure.partial_usage);
                self.store.save_record(&record).await?;
                return Ok(record);
            }
        };

        // enriching: failures are absorbed, the record still completes
        let mut artifacts = research_core::ArtifactBag::default();
        artifacts.extra.extend(outcome.raw_artifacts.clone());

        let mut text = String::with_capacity(input.question.len() + outcome.response.len() + 1);
        text.push_str(&input.question);
        text.push('\n');
        text.push_str(&outcome.response);
        let tickers = extract_tickers(&text);

        let profile = enrichment_profile(input.mode, input.verbosity);
        let mut data_fragments = 0usize;
        if let Some((primary, related)) = tickers.split_first() {
            let bag = self.pipeline.enrich(primary, related, profile).await;
            data_fragments = bag.len();
            artifacts.merge(bag);
        }
        debug!(
            tickers = tickers.len(),
            fragments = data_fragments,
            "enrichment finished"
        );

        // settling
        let mut usage = outcome.usage;
        usage.cost.data = data_fragments as f64 * self.config.data_cost_per_fragment;
        self.ledger
            .record_usage(user_id, &input.session_id, usage.cost.total())
            .await;

        record.artifacts = artifacts;
        record.complete(outcome.response, outcome.provider, outcome.model, usage);
        self.store.save_record(&record).await?;

        info!(
            record_id = %record.id,
            cost = usage.cost.total(),
            "query completed"
        );
        Ok(record)
    }
}

/// Profile selection: deep work gets the full fragment set
fn enrichment_profile(mode: QueryMode, verbosity: Verbosity) -> EnrichmentProfile {
    if mode == QueryMode::Deep || verbosity == Verbosity::Detailed {
        EnrichmentProfile::Full
    } else {
        EnrichmentProfile::Light
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{BudgetLedger, BudgetSettings};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use research_core::QueryStatus;
    use research_llm::{
        CompletionRequest, CompletionResponse, LLMProvider, StopReason, TokenUsage,
    };
    use research_market::{MarketData, MarketError};
    use serde_json::{Value, json};
    use std::time::Duration;

    struct StubProvider {
        text: &'static str,
        delay: Option<Duration>,
        fail: bool,
    }

    #[async_trait]
    impl LLMProvider for StubProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> research_llm::Result<CompletionResponse> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(research_llm::LLMError::RequestFailed(
                    "boom".to_string(),
                ));
            }
            Ok(CompletionResponse {
                text: self.text.to_string(),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage {
                    input_tokens: 1000,
                    output_tokens: 1000,
                },
            })
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    /// Source where every fragment fetch fails
    struct NoDataSource;

    macro_rules! unavailable {
        ($ticker:expr) => {
            Err(MarketError::DataUnavailable {
                ticker: $ticker.to_string(),
                reason: "down".to_string(),
            })
        };
    }

    #[async_trait]
    impl MarketData for NoDataSource {
        async fn price_chart(&self, t: &str) -> research_market::Result<Value> {
            unavailable!(t)
        }
        async fn metric_snapshot(
            &self,
            t: &str,
            _related: &[String],
        ) -> research_market::Result<Value> {
            unavailable!(t)
        }
        async fn macro_cards(&self) -> research_market::Result<Value> {
            unavailable!("MACRO")
        }
        async fn earnings_calendar(&self, t: &str) -> research_market::Result<Value> {
            unavailable!(t)
        }
        async fn news_sentiment(&self, t: &str) -> research_market::Result<Value> {
            unavailable!(t)
        }
        async fn options_activity(&self, t: &str) -> research_market::Result<Value> {
            unavailable!(t)
        }
        async fn filing_changes(&self, t: &str) -> research_market::Result<Value> {
            unavailable!(t)
        }
        async fn transcript_qa(&self, t: &str) -> research_market::Result<Value> {
            unavailable!(t)
        }
        async fn ownership_trend(&self, t: &str) -> research_market::Result<Value> {
            unavailable!(t)
        }
    }

    /// Source that serves a couple of fragments
    struct CannedSource;

    #[async_trait]
    impl MarketData for CannedSource {
        async fn price_chart(&self, _t: &str) -> research_market::Result<Value> {
            Ok(json!({"points": 3}))
        }
        async fn metric_snapshot(
            &self,
            _t: &str,
            _related: &[String],
        ) -> research_market::Result<Value> {
            Ok(json!({"pe": 30.1}))
        }
        async fn macro_cards(&self) -> research_market::Result<Value> {
            Ok(json!({"cards": []}))
        }
        async fn earnings_calendar(&self, t: &str) -> research_market::Result<Value> {
            Err(MarketError::DataUnavailable {
                ticker: t.to_string(),
                reason: "none".to_string(),
            })
        }
        async fn news_sentiment(&self, t: &str) -> research_market::Result<Value> {
            Err(MarketError::DataUnavailable {
                ticker: t.to_string(),
                reason: "none".to_string(),
            })
        }
        async fn options_activity(&self, t: &str) -> research_market::Result<Value> {
            Err(MarketError::DataUnavailable {
                ticker: t.to_string(),
                reason: "none".to_string(),
            })
        }
        async fn filing_changes(&self, t: &str) -> research_market::Result<Value> {
            Err(MarketError::DataUnavailable {
                ticker: t.to_string(),
                reason: "none".to_string(),
            })
        }
        async fn transcript_qa(&self, t: &str) -> research_market::Result<Value> {
            Err(MarketError::DataUnavailable {
                ticker: t.to_string(),
                reason: "none".to_string(),
            })
        }
        async fn ownership_trend(&self, t: &str) -> research_market::Result<Value> {
            Err(MarketError::DataUnavailable {
                ticker: t.to_string(),
                reason: "none".to_string(),
            })
        }
    }

    struct Harness {
        executor: QueryExecutor,
        ledger: Arc<BudgetLedger>,
        store: Arc<MemoryStore>,
    }

    fn harness(provider: StubProvider, source: Arc<dyn MarketData>, daily_cap: f64) -> Harness {
        let config = Arc::new(EngineConfig::default());
        let ledger = Arc::new(BudgetLedger::new(BudgetSettings {
            daily_cap,
            monthly_cap: 1000.0,
            session_cap: 1000.0,
            per_query_cap: 1000.0,
        }));
        let adapter = Arc::new(AgentAdapter::new(
            Arc::new(provider),
            None,
            Arc::clone(&config),
        ));
        let pipeline = Arc::new(EnrichmentPipeline::new(source, 3));
        let store = Arc::new(MemoryStore::new());
        let executor = QueryExecutor::new(
            Arc::clone(&ledger),
            adapter,
            pipeline,
            Arc::clone(&store) as Arc<dyn QueryStore>,
            config,
        );
        Harness {
            executor,
            ledger,
            store,
        }
    }

    fn ok_provider() -> StubProvider {
        StubProvider {
            text: "AAPL looks steady",
            delay: None,
            fail: false,
        }
    }

    #[tokio::test]
    async fn test_completed_query_records_usage_once() {
        let h = harness(ok_provider(), Arc::new(CannedSource), 1000.0);
        let record = h
            .executor
            .execute("u1", QueryInput::new("s1", "AAPL outlook"))
            .await
            .unwrap();

        assert_eq!(record.status, QueryStatus::Completed);
        assert!(record.response.is_some());
        assert!(record.error.is_none());

        let usage = record.usage.unwrap();
        // agent: 1000 in + 1000 out on sonnet pricing; data: 2 light fragments
        assert!((usage.cost.agent - 0.018).abs() < 1e-12);
        assert!((usage.cost.data - 0.004).abs() < 1e-12);

        let snapshot = h.ledger.snapshot("u1", Some("s1")).await;
        assert!((snapshot.spent.daily - usage.cost.total()).abs() < 1e-9);

        // exactly one persisted record
        assert_eq!(h.store.record_count().await, 1);
    }

    #[tokio::test]
    async fn test_budget_denial_skips_agent_and_records_nothing() {
        // estimate for auto/standard is ~0.069; a daily cap below that denies
        let h = harness(ok_provider(), Arc::new(CannedSource), 0.01);
        let record = h
            .executor
            .execute("u1", QueryInput::new("s1", "AAPL outlook"))
            .await
            .unwrap();

        assert_eq!(record.status, QueryStatus::Failed);
        let error = record.error.unwrap();
        assert!(error.contains("budget exceeded"));
        assert!(error.contains("daily"));
        assert!(record.usage.is_none());

        let snapshot = h.ledger.snapshot("u1", None).await;
        assert!(snapshot.spent.daily.abs() < 1e-12);
        assert_eq!(h.store.record_count().await, 1);
    }

    #[tokio::test]
    async fn test_agent_failure_is_terminal_and_costless() {
        let h = harness(
            StubProvider {
                text: "",
                delay: None,
                fail: true,
            },
            Arc::new(CannedSource),
            1000.0,
        );
        let record = h
            .executor
            .execute("u1", QueryInput::new("s1", "AAPL outlook"))
            .await
            .unwrap();

        assert_eq!(record.status, QueryStatus::Failed);
        assert!(record.error.unwrap().contains("agent provider error"));

        let snapshot = h.ledger.snapshot("u1", None).await;
        assert!(snapshot.spent.daily.abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_empty_answer_bills_partial_usage() {
        let h = harness(
            StubProvider {
                text: "   ",
                delay: None,
                fail: false,
            },
            Arc::new(CannedSource),
            1000.0,
        );
        let record = h
            .executor
            .execute("u1", QueryInput::new("s1", "AAPL outlook"))
            .await
            .unwrap();

        assert_eq!(record.status, QueryStatus::Failed);
        let partial = record.usage.expect("partial usage is billable");
        assert!(partial.cost.agent > 0.0);

        let snapshot = h.ledger.snapshot("u1", None).await;
        assert!((snapshot.spent.daily - partial.cost.total()).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_all_fragments_failing_still_completes() {
        let h = harness(ok_provider(), Arc::new(NoDataSource), 1000.0);
        let record = h
            .executor
            .execute("u1", QueryInput::new("s1", "AAPL outlook"))
            .await
            .unwrap();

        assert_eq!(record.status, QueryStatus::Completed);
        // the agent trace artifact survives; no market fragment does
        assert!(record.artifacts.get(research_core::FragmentKind::PriceChart).is_none());
        let usage = record.usage.unwrap();
        assert!(usage.cost.data.abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_no_tickers_skips_enrichment() {
        let h = harness(
            StubProvider {
                text: "markets are calm today",
                delay: None,
                fail: false,
            },
            Arc::new(CannedSource),
            1000.0,
        );
        let record = h
            .executor
            .execute("u1", QueryInput::new("s1", "how are markets doing?"))
            .await
            .unwrap();

        assert_eq!(record.status, QueryStatus::Completed);
        assert!(record.artifacts.get(research_core::FragmentKind::PriceChart).is_none());
    }

    #[tokio::test]
    async fn test_storage_fault_surfaces_as_hard_error() {
        use crate::error::EngineError;
        use crate::store::MockQueryStore;

        let mut store = MockQueryStore::new();
        store.expect_load_session().returning(|_| Ok(None));
        store
            .expect_save_record()
            .returning(|_| Err(EngineError::Storage("store unreachable".to_string())));

        let config = Arc::new(EngineConfig::default());
        let ledger = Arc::new(BudgetLedger::new(BudgetSettings::default()));
        let adapter = Arc::new(AgentAdapter::new(
            Arc::new(ok_provider()),
            None,
            Arc::clone(&config),
        ));
        let pipeline = Arc::new(EnrichmentPipeline::new(Arc::new(NoDataSource), 3));
        let executor = QueryExecutor::new(
            ledger,
            adapter,
            pipeline,
            Arc::new(store),
            config,
        );

        let result = executor
            .execute("u1", QueryInput::new("s1", "AAPL outlook"))
            .await;
        assert!(matches!(result, Err(EngineError::Storage(_))));
    }

    #[test]
    fn test_profile_selection() {
        assert_eq!(
            enrichment_profile(QueryMode::Deep, Verbosity::Standard),
            EnrichmentProfile::Full
        );
        assert_eq!(
            enrichment_profile(QueryMode::Auto, Verbosity::Detailed),
            EnrichmentProfile::Full
        );
        assert_eq!(
            enrichment_profile(QueryMode::Auto, Verbosity::Standard),
            EnrichmentProfile::Light
        );
        assert_eq!(
            enrichment_profile(QueryMode::Fast, Verbosity::Brief),
            EnrichmentProfile::Light
        );
    }
}
