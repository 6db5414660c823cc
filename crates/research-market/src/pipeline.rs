//! Enrichment pipeline orchestration
//!
//! The pipeline fans out over independently fallible fragment fetches and
//! assembles whatever succeeded into an [`ArtifactBag`]. A fragment failure
//! is logged and absorbed; it never aborts the other fragments and never
//! surfaces to the caller.

use crate::error::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use research_core::{ArtifactBag, FragmentKind};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// How much enrichment a query gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentProfile {
    /// Price chart and metric snapshot only
    Light,
    /// Attempt every fragment
    Full,
}

/// One async method per enrichment fragment
///
/// Implementations fetch from live upstreams; tests mock the whole surface.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Historical price series with indicator overlays
    async fn price_chart(&self, ticker: &str) -> Result<Value>;

    /// Valuation/trading metrics, with peer snapshots for related tickers
    async fn metric_snapshot(&self, ticker: &str, related: &[String]) -> Result<Value>;

    /// Macro indicator cards (ticker-independent)
    async fn macro_cards(&self) -> Result<Value>;

    /// Upcoming and trailing earnings dates
    async fn earnings_calendar(&self, ticker: &str) -> Result<Value>;

    /// Recent headlines with sentiment scores
    async fn news_sentiment(&self, ticker: &str) -> Result<Value>;

    /// Options chain volume summary
    async fn options_activity(&self, ticker: &str) -> Result<Value>;

    /// Recent 10-K/10-Q/8-K filings
    async fn filing_changes(&self, ticker: &str) -> Result<Value>;

    /// Earnings-call Q&A highlights
    async fn transcript_qa(&self, ticker: &str) -> Result<Value>;

    /// Insider Form 4 filing cadence
    async fn ownership_trend(&self, ticker: &str) -> Result<Value>;
}

/// Assembles artifact bags from a [`MarketData`] source
pub struct EnrichmentPipeline {
    source: Arc<dyn MarketData>,
    max_related: usize,
}

impl EnrichmentPipeline {
    /// Create a pipeline over a data source
    pub fn new(source: Arc<dyn MarketData>, max_related: usize) -> Self {
        Self {
            source,
            max_related,
        }
    }

    /// Fetch the profile's fragments for a ticker
    ///
    /// Returns whatever fragments succeeded; a fully failed fetch round
    /// yields an empty bag, which is not an error.
    pub async fn enrich(
        &self,
        ticker: &str,
        related: &[String],
        profile: EnrichmentProfile,
    ) -> ArtifactBag {
        let related = &related[..related.len().min(self.max_related)];
        let mut bag = ArtifactBag::default();

        match profile {
            EnrichmentProfile::Light => {
                let (chart, metrics) = tokio::join!(
                    self.source.price_chart(ticker),
                    self.source.metric_snapshot(ticker, related),
                );
                absorb(&mut bag, FragmentKind::PriceChart, chart);
                absorb(&mut bag, FragmentKind::MetricSnapshot, metrics);
            }
            EnrichmentProfile::Full => {
                let (
                    chart,
                    metrics,
                    macro_cards,
                    earnings,
                    news,
                    options,
                    filings,
                    transcript,
                    ownership,
                ) = tokio::join!(
                    self.source.price_chart(ticker),
                    self.source.metric_snapshot(ticker, related),
                    self.source.macro_cards(),
                    self.source.earnings_calendar(ticker),
                    self.source.news_sentiment(ticker),
                    self.source.options_activity(ticker),
                    self.source.filing_changes(ticker),
                    self.source.transcript_qa(ticker),
                    self.source.ownership_trend(ticker),
                );
                absorb(&mut bag, FragmentKind::PriceChart, chart);
                absorb(&mut bag, FragmentKind::MetricSnapshot, metrics);
                absorb(&mut bag, FragmentKind::MacroCards, macro_cards);
                absorb(&mut bag, FragmentKind::EarningsCalendar, earnings);
                absorb(&mut bag, FragmentKind::NewsSentiment, news);
                absorb(&mut bag, FragmentKind::OptionsActivity, options);
                absorb(&mut bag, FragmentKind::FilingChanges, filings);
                absorb(&mut bag, FragmentKind::TranscriptQa, transcript);
                absorb(&mut bag, FragmentKind::OwnershipTrend, ownership);
            }
        }

        debug!(
            ticker,
            fragments = bag.len(),
            profile = ?profile,
            "enrichment round finished"
        );
        bag
    }
}

fn absorb(bag: &mut ArtifactBag, kind: FragmentKind, result: Result<Value>) {
    match result {
        Ok(value) => bag.set(kind, value),
        Err(e) => {
            warn!(fragment = kind.as_str(), error = %e, "fragment fetch failed, omitting");
        }
    }
}
