//! Market enrichment pipeline for research-rs
//!
//! Given a ticker and an enrichment profile, this crate assembles the
//! optional artifact fragments attached to a research answer:
//!
//! - Price chart with SMA overlays (Yahoo Finance)
//! - Metric snapshot with peer closes (Yahoo Finance)
//! - Macro indicator cards (FRED)
//! - Earnings calendar and options activity (Yahoo Finance)
//! - News sentiment and transcript Q&A (Finnhub)
//! - Filing changes and ownership trend (SEC EDGAR)
//!
//! Every fragment is independently fallible; the [`EnrichmentPipeline`]
//! returns whatever succeeded and absorbs the rest. Fetches go through a
//! tiered TTL cache and per-upstream rate limiters.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod live;
pub mod pipeline;
pub mod tickers;

// Re-export main types for convenience
pub use cache::{CacheKey, CacheTiers, FragmentCache};
pub use config::MarketConfig;
pub use error::{MarketError, Result};
pub use live::LiveMarketData;
pub use pipeline::{EnrichmentPipeline, EnrichmentProfile, MarketData};
pub use tickers::extract_tickers;
