//! Asynchronous query-execution engine for research-rs
//!
//! The core of the system: accept a natural-language research question,
//! admit it against per-user budget caps, run the answering capability,
//! enrich the result with market-data artifacts, and settle actual spend -
//! synchronously or as a polled background job.
//!
//! # Architecture
//!
//! - [`budget::BudgetLedger`]: per-user caps, side-effect-free admission,
//!   atomic settlement
//! - [`agent::AgentAdapter`]: provider strategy, timeout, and output
//!   normalization for the answering capability
//! - [`executor::QueryExecutor`]: admitting -> executing -> enriching ->
//!   settling, one terminal persistence write per invocation
//! - [`queue::JobQueue`]: background jobs with owner-scoped polling
//! - [`store::QueryStore`]: durable-store seam (in-memory implementation
//!   included)
//! - [`engine::QueryEngine`]: the facade a transport layer wraps
//!
//! # Example
//!
//! ```rust,ignore
//! use research_engine::{AgentAdapter, BudgetSettings, EngineConfig, MemoryStore, QueryEngine};
//! use research_market::{EnrichmentPipeline, LiveMarketData, MarketConfig};
//! use std::sync::Arc;
//!
//! # async fn example(provider: Arc<dyn research_llm::LLMProvider>) -> anyhow::Result<()> {
//! let config = Arc::new(EngineConfig::default());
//! let adapter = Arc::new(AgentAdapter::new(provider, None, Arc::clone(&config)));
//! let market = Arc::new(LiveMarketData::new(MarketConfig::default().with_env_keys())?);
//! let pipeline = Arc::new(EnrichmentPipeline::new(market, 3));
//! let store = Arc::new(MemoryStore::new());
//!
//! let engine = QueryEngine::new(adapter, pipeline, store, config, BudgetSettings::default());
//! let job = engine.enqueue_query("u1", research_core::QueryInput::new("s1", "AAPL outlook")).await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod budget;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod queue;
pub mod store;

// Re-export main types for convenience
pub use agent::{AgentAdapter, AgentError, AgentFailure, AgentOutcome};
pub use budget::{
    Admission, BudgetLedger, BudgetPatch, BudgetRemaining, BudgetSettings, BudgetSnapshot,
    BudgetSpent,
};
pub use config::{EngineConfig, ModelPricing};
pub use engine::QueryEngine;
pub use error::{CapKind, EngineError, Result};
pub use executor::QueryExecutor;
pub use queue::JobQueue;
pub use store::{MemoryStore, QueryStore};
