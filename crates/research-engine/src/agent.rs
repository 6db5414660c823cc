//! Agent execution adapter
//!
//! Wraps the answering capability behind a single `run` call that the
//! executor treats as a black box. The adapter owns provider/model strategy
//! (decided once per run from the query mode), the per-attempt timeout, and
//! the normalization of provider output into an [`AgentOutcome`] with a
//! priced cost breakdown. Fallback between attempts is the adapter's
//! internal policy; the executor never retries.

use crate::config::EngineConfig;
use research_core::{CostBreakdown, QueryMode, SessionContext, Usage};
use research_llm::{CompletionRequest, LLMProvider, Message};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Failures of the answering capability
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// No attempt finished inside the configured bound
    #[error("agent timed out after {0:?}")]
    Timeout(Duration),

    /// The capability answered with something unusable
    #[error("malformed agent output: {0}")]
    Malformed(String),

    /// The capability was unreachable or rejected the request
    #[error("agent provider error: {0}")]
    Provider(String),
}

/// A failed run, with whatever usage the capability reported before failing
///
/// Absent partial usage means the attempt incurred no billable cost.
#[derive(Debug)]
pub struct AgentFailure {
    pub error: AgentError,
    pub partial_usage: Option<Usage>,
}

impl AgentFailure {
    fn bare(error: AgentError) -> Self {
        Self {
            error,
            partial_usage: None,
        }
    }
}

/// Normalized output of one successful run
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// Answer text
    pub response: String,
    /// Token counts and priced cost (agent center only; the executor adds
    /// data costs during settlement)
    pub usage: Usage,
    /// Provider label of the attempt that succeeded
    pub provider: String,
    /// Model label of the attempt that succeeded
    pub model: String,
    /// Raw artifacts the capability produced (trace metadata, source links)
    pub raw_artifacts: HashMap<String, Value>,
}

/// One planned attempt
struct Attempt {
    provider: Arc<dyn LLMProvider>,
    model: String,
}

/// Adapter over the answering capability
pub struct AgentAdapter {
    primary: Arc<dyn LLMProvider>,
    fallback: Option<Arc<dyn LLMProvider>>,
    config: Arc<EngineConfig>,
}

impl AgentAdapter {
    /// Create an adapter with a primary and optional fallback provider
    pub fn new(
        primary: Arc<dyn LLMProvider>,
        fallback: Option<Arc<dyn LLMProvider>>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            primary,
            fallback,
            config,
        }
    }

    /// Estimated cost of a query before running it
    ///
    /// Uses the first planned attempt's pricing with the configured input
    /// estimate and the verbosity's full output budget. Used only for
    /// admission.
    pub fn estimate_cost(&self, mode: QueryMode, verbosity: research_core::Verbosity) -> f64 {
        let model = match mode {
            QueryMode::Fast => &self.config.fast_model,
            QueryMode::Auto | QueryMode::Deep => &self.config.model,
        };
        let pricing = self.config.pricing_for(model);
        pricing.cost(
            self.config.estimated_input_tokens,
            self.config.max_tokens_for(verbosity),
        )
    }

    /// Run the capability for one question
    ///
    /// The attempt plan is fixed here, at the start, from the context's
    /// mode; execution then walks the plan without further branching.
    #[instrument(skip(self, question, ctx), fields(mode = ?ctx.mode()))]
    pub async fn run(
        &self,
        question: &str,
        ctx: &SessionContext,
    ) -> std::result::Result<AgentOutcome, AgentFailure> {
        let attempts = self.plan(ctx.mode());
        let max_tokens = self.config.max_tokens_for(ctx.verbosity());

        let mut last_failure: Option<AgentFailure> = None;
        for attempt in &attempts {
            match self.try_attempt(attempt, question, max_tokens).await {
                Ok(outcome) => return Ok(outcome),
                Err(failure) => {
                    warn!(
                        provider = attempt.provider.name(),
                        model = %attempt.model,
                        error = %failure.error,
                        "agent attempt failed"
                    );
                    last_failure = Some(failure);
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| {
            AgentFailure::bare(AgentError::Provider("no providers configured".to_string()))
        }))
    }

    /// Resolve the mode into an ordered attempt plan
    fn plan(&self, mode: QueryMode) -> Vec<Attempt> {
        match mode {
            QueryMode::Fast => vec![Attempt {
                provider: Arc::clone(&self.primary),
                model: self.config.fast_model.clone(),
            }],
            QueryMode::Deep => vec![Attempt {
                provider: Arc::clone(&self.primary),
                model: self.config.model.clone(),
            }],
            QueryMode::Auto => {
                let mut attempts = vec![Attempt {
                    provider: Arc::clone(&self.primary),
                    model: self.config.model.clone(),
                }];
                if let Some(fallback) = &self.fallback {
                    attempts.push(Attempt {
                        provider: Arc::clone(fallback),
                        model: self.config.fallback_model.clone(),
                    });
                }
                attempts
            }
        }
    }

    async fn try_attempt(
        &self,
        attempt: &Attempt,
        question: &str,
        max_tokens: usize,
    ) -> std::result::Result<AgentOutcome, AgentFailure> {
        let request = CompletionRequest::builder(&attempt.model)
            .add_message(Message::user(question))
            .system(self.config.system_prompt.clone())
            .max_tokens(max_tokens)
            .temperature(self.config.temperature)
            .build();

        let completion =
            match tokio::time::timeout(self.config.agent_timeout, attempt.provider.complete(request))
                .await
            {
                Err(_) => {
                    return Err(AgentFailure::bare(AgentError::Timeout(
                        self.config.agent_timeout,
                    )));
                }
                Ok(Err(e)) => {
                    return Err(AgentFailure::bare(AgentError::Provider(e.to_string())));
                }
                Ok(Ok(completion)) => completion,
            };

        let pricing = self.config.pricing_for(&attempt.model);
        let usage = Usage {
            input_tokens: completion.usage.input_tokens,
            output_tokens: completion.usage.output_tokens,
            cost: CostBreakdown::agent_only(pricing.cost(
                completion.usage.input_tokens,
                completion.usage.output_tokens,
            )),
        };

        // An empty completion still consumed tokens; bill them as partial
        if completion.text.trim().is_empty() {
            return Err(AgentFailure {
                error: AgentError::Malformed("capability returned an empty answer".to_string()),
                partial_usage: Some(usage),
            });
        }

        debug!(
            provider = attempt.provider.name(),
            model = %attempt.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "agent attempt succeeded"
        );

        let mut raw_artifacts = HashMap::new();
        raw_artifacts.insert(
            "agent_trace".to_string(),
            serde_json::json!({
                "provider": attempt.provider.name(),
                "model": attempt.model,
                "stop_reason": completion.stop_reason,
            }),
        );

        Ok(AgentOutcome {
            response: completion.text,
            usage,
            provider: attempt.provider.name().to_string(),
            model: attempt.model.clone(),
            raw_artifacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use research_core::Verbosity;
    use research_llm::{CompletionResponse, LLMError, StopReason, TokenUsage};

    /// Scriptable provider stub for adapter tests
    struct StubProvider {
        name: &'static str,
        text: &'static str,
        delay: Option<Duration>,
        fail: bool,
    }

    impl StubProvider {
        fn answering(name: &'static str, text: &'static str) -> Self {
            Self {
                name,
                text,
                delay: None,
                fail: false,
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                name,
                text: "",
                delay: None,
                fail: true,
            }
        }
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
                return Err(LLMError::RequestFailed("connection refused".to_string()));
            }
            Ok(CompletionResponse {
                text: self.text.to_string(),
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage {
                    input_tokens: 1000,
                    output_tokens: 500,
                },
            })
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn adapter_with(
        primary: StubProvider,
        fallback: Option<StubProvider>,
    ) -> AgentAdapter {
        AgentAdapter::new(
            Arc::new(primary),
            fallback.map(|f| Arc::new(f) as Arc<dyn LLMProvider>),
            Arc::new(EngineConfig::default()),
        )
    }

    fn ctx(mode: QueryMode) -> SessionContext {
        SessionContext::new()
            .with_user_id("u1")
            .with_session_id("s1")
            .with_mode(mode)
    }

    #[tokio::test]
    async fn test_successful_run_prices_usage() {
        let adapter = adapter_with(StubProvider::answering("anthropic", "the answer"), None);
        let outcome = adapter
            .run("AAPL outlook?", &ctx(QueryMode::Deep))
            .await
            .expect("run should succeed");

        assert_eq!(outcome.response, "the answer");
        assert_eq!(outcome.provider, "anthropic");
        assert_eq!(outcome.model, "claude-sonnet-4-5-20250929");
        // 1000 in * 0.003/1k + 500 out * 0.015/1k
        assert!((outcome.usage.cost.agent - (0.003 + 0.0075)).abs() < 1e-12);
        assert!(outcome.raw_artifacts.contains_key("agent_trace"));
    }

    #[tokio::test]
    async fn test_auto_mode_falls_back() {
        let adapter = adapter_with(
            StubProvider::failing("anthropic"),
            Some(StubProvider::answering("openai", "fallback answer")),
        );
        let outcome = adapter
            .run("question", &ctx(QueryMode::Auto))
            .await
            .expect("fallback should answer");

        assert_eq!(outcome.provider, "openai");
        assert_eq!(outcome.model, "gpt-4.1");
    }

    #[tokio::test]
    async fn test_fast_mode_does_not_fall_back() {
        let adapter = adapter_with(
            StubProvider::failing("anthropic"),
            Some(StubProvider::answering("openai", "unused")),
        );
        let failure = adapter
            .run("question", &ctx(QueryMode::Fast))
            .await
            .expect_err("fast mode pins one attempt");

        assert!(matches!(failure.error, AgentError::Provider(_)));
        assert!(failure.partial_usage.is_none());
    }

    #[tokio::test]
    async fn test_timeout_maps_to_agent_error() {
        let mut config = EngineConfig::default();
        config.agent_timeout = Duration::from_millis(20);
        let provider = StubProvider {
            name: "anthropic",
            text: "late",
            delay: Some(Duration::from_millis(200)),
            fail: false,
        };
        let adapter = AgentAdapter::new(Arc::new(provider), None, Arc::new(config));

        let failure = adapter
            .run("question", &ctx(QueryMode::Deep))
            .await
            .expect_err("should time out");

        assert!(matches!(failure.error, AgentError::Timeout(_)));
        assert!(failure.partial_usage.is_none());
    }

    #[tokio::test]
    async fn test_empty_answer_reports_partial_usage() {
        let adapter = adapter_with(StubProvider::answering("anthropic", "   "), None);
        let failure = adapter
            .run("question", &ctx(QueryMode::Deep))
            .await
            .expect_err("empty answer is malformed");

        assert!(matches!(failure.error, AgentError::Malformed(_)));
        let partial = failure.partial_usage.expect("tokens were consumed");
        assert_eq!(partial.input_tokens, 1000);
        assert!(partial.cost.agent > 0.0);
    }

    #[test]
    fn test_estimate_depends_on_mode_and_verbosity() {
        let adapter = adapter_with(StubProvider::answering("anthropic", "x"), None);

        let deep = adapter.estimate_cost(QueryMode::Deep, Verbosity::Standard);
        let fast = adapter.estimate_cost(QueryMode::Fast, Verbosity::Standard);
        assert!(fast < deep);

        let brief = adapter.estimate_cost(QueryMode::Deep, Verbosity::Brief);
        assert!(brief < deep);
    }
}
