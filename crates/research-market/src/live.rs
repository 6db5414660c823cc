//! Live [`MarketData`] implementation over the upstream clients
//!
//! Every fragment goes through the tiered cache; upstreams without a
//! configured key report `ConfigError`, which the pipeline absorbs like any
//! other fragment failure.

use crate::api::{EdgarClient, FinnhubClient, FredClient, YahooClient};
use crate::cache::{CacheKey, CacheTiers};
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::pipeline::MarketData;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Words that push a headline's score up
const POSITIVE_WORDS: &[&str] = &[
    "beat", "beats", "boost", "bullish", "gain", "gains", "growth", "jump", "outperform",
    "profit", "raise", "rally", "record", "soar", "strong", "surge", "upgrade",
];

/// Words that push a headline's score down
const NEGATIVE_WORDS: &[&str] = &[
    "bearish", "cut", "decline", "downgrade", "drop", "fall", "falls", "fine", "lawsuit",
    "layoff", "loss", "miss", "misses", "plunge", "probe", "recall", "slump", "weak",
];

/// Live market-data source
pub struct LiveMarketData {
    config: MarketConfig,
    yahoo: YahooClient,
    fred: Option<FredClient>,
    finnhub: Option<FinnhubClient>,
    edgar: EdgarClient,
    caches: CacheTiers,
}

impl LiveMarketData {
    /// Create a live source from configuration
    pub fn new(config: MarketConfig) -> Result<Self> {
        config.validate()?;

        let yahoo = YahooClient::new(config.request_timeout)?;
        let fred = config.fred_api_key.clone().map(FredClient::new);
        let finnhub = config.finnhub_api_key.clone().map(FinnhubClient::new);
        let edgar = EdgarClient::new(config.edgar_user_agent.clone());
        let caches = CacheTiers::new(
            config.cache_ttl_quotes,
            config.cache_ttl_reference,
            config.cache_ttl_news,
        );

        Ok(Self {
            config,
            yahoo,
            fred,
            finnhub,
            edgar,
            caches,
        })
    }

    fn fred(&self) -> Result<&FredClient> {
        self.fred.as_ref().ok_or_else(|| {
            MarketError::ConfigError("FRED API key not configured".to_string())
        })
    }

    fn finnhub(&self) -> Result<&FinnhubClient> {
        self.finnhub.as_ref().ok_or_else(|| {
            MarketError::ConfigError("Finnhub API key not configured".to_string())
        })
    }
}

#[async_trait]
impl MarketData for LiveMarketData {
    async fn price_chart(&self, ticker: &str) -> Result<Value> {
        let range = self.config.chart_range.clone();
        let key = CacheKey::new(ticker, "price_chart", json!({ "range": &range }));

        self.caches
            .quotes
            .get_or_fetch(key, || async {
                let bars = self.yahoo.history_range(ticker, &range).await?;
                let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

                let candlesticks: Vec<Value> = bars
                    .iter()
                    .map(|b| {
                        json!({
                            "timestamp": b.timestamp.to_rfc3339(),
                            "open": b.open,
                            "high": b.high,
                            "low": b.low,
                            "close": b.close,
                            "volume": b.volume,
                        })
                    })
                    .collect();

                let mut overlays = json!({});
                for period in [20usize, 50] {
                    if let Some(series) = sma_series(&closes, period) {
                        overlays[format!("sma_{period}")] = json!(series);
                    }
                }

                Ok(json!({
                    "ticker": ticker,
                    "range": range,
                    "data_points": bars.len(),
                    "candlestick": candlesticks,
                    "overlays": overlays,
                }))
            })
            .await
    }

    async fn metric_snapshot(&self, ticker: &str, related: &[String]) -> Result<Value> {
        let key = CacheKey::new(ticker, "metric_snapshot", json!({ "peers": related }));

        self.caches
            .reference
            .get_or_fetch(key, || async {
                let bars = self.yahoo.history_range(ticker, "1y").await?;
                let closes: Vec<f64> = bars.iter().map(|b| b.adjclose).collect();
                let last = closes.last().copied().ok_or_else(|| {
                    MarketError::DataUnavailable {
                        ticker: ticker.to_string(),
                        reason: "empty price history".to_string(),
                    }
                })?;

                let high_52w = closes.iter().copied().fold(f64::MIN, f64::max);
                let low_52w = closes.iter().copied().fold(f64::MAX, f64::min);

                // Peer closes; a failing peer is skipped, not fatal
                let mut peers = Vec::new();
                for peer in related {
                    match self.yahoo.latest_bar(peer).await {
                        Ok(bar) => peers.push(json!({ "ticker": peer, "close": bar.close })),
                        Err(e) => {
                            tracing::debug!(peer, error = %e, "skipping peer snapshot");
                        }
                    }
                }

                Ok(json!({
                    "ticker": ticker,
                    "close": last,
                    "high_52w": high_52w,
                    "low_52w": low_52w,
                    "change_1mo_pct": trailing_change(&closes, 21),
                    "change_3mo_pct": trailing_change(&closes, 63),
                    "realized_vol_annualized": realized_volatility(&closes),
                    "peer_snapshots": peers,
                }))
            })
            .await
    }

    async fn macro_cards(&self) -> Result<Value> {
        let fred = self.fred()?;
        let key = CacheKey::new("MACRO", "macro_cards", json!({}));

        self.caches
            .reference
            .get_or_fetch(key, || async { fred.macro_cards().await })
            .await
    }

    async fn earnings_calendar(&self, ticker: &str) -> Result<Value> {
        let key = CacheKey::new(ticker, "earnings_calendar", json!({}));

        self.caches
            .reference
            .get_or_fetch(key, || async { self.yahoo.earnings_dates(ticker).await })
            .await
    }

    async fn news_sentiment(&self, ticker: &str) -> Result<Value> {
        let finnhub = self.finnhub()?;
        let key = CacheKey::new(ticker, "news_sentiment", json!({}));

        self.caches
            .news
            .get_or_fetch(key, || async {
                let articles = finnhub.company_news(ticker).await?;
                if articles.is_empty() {
                    return Err(MarketError::DataUnavailable {
                        ticker: ticker.to_string(),
                        reason: "no recent headlines".to_string(),
                    });
                }

                let scored: Vec<Value> = articles
                    .iter()
                    .take(10)
                    .map(|a| {
                        json!({
                            "headline": a.headline,
                            "source": a.source,
                            "url": a.url,
                            "published_at": a.datetime,
                            "sentiment_score": score_headline(&a.headline),
                        })
                    })
                    .collect();

                let mean: f64 = scored
                    .iter()
                    .filter_map(|s| s["sentiment_score"].as_f64())
                    .sum::<f64>()
                    / scored.len() as f64;

                Ok(json!({
                    "ticker": ticker,
                    "overall_score": mean,
                    "overall_label": sentiment_label(mean),
                    "headlines": scored,
                }))
            })
            .await
    }

    async fn options_activity(&self, ticker: &str) -> Result<Value> {
        let key = CacheKey::new(ticker, "options_activity", json!({}));

        self.caches
            .quotes
            .get_or_fetch(key, || async { self.yahoo.options_summary(ticker).await })
            .await
    }

    async fn filing_changes(&self, ticker: &str) -> Result<Value> {
        let key = CacheKey::new(ticker, "filing_changes", json!({}));

        self.caches
            .reference
            .get_or_fetch(key, || async { self.edgar.filing_changes(ticker).await })
            .await
    }

    async fn transcript_qa(&self, ticker: &str) -> Result<Value> {
        let finnhub = self.finnhub()?;
        let key = CacheKey::new(ticker, "transcript_qa", json!({}));

        self.caches
            .reference
            .get_or_fetch(key, || async { finnhub.latest_transcript_qa(ticker).await })
            .await
    }

    async fn ownership_trend(&self, ticker: &str) -> Result<Value> {
        let key = CacheKey::new(ticker, "ownership_trend", json!({}));

        self.caches
            .reference
            .get_or_fetch(key, || async { self.edgar.ownership_trend(ticker).await })
            .await
    }
}

/// Simple moving average over closes; None when history is too short
fn sma_series(closes: &[f64], period: usize) -> Option<Vec<f64>> {
    use ta::{Next, indicators::SimpleMovingAverage};

    if period == 0 || closes.len() < period {
        return None;
    }
    let mut sma = SimpleMovingAverage::new(period).ok()?;
    Some(closes.iter().map(|&close| sma.next(close)).collect())
}

/// Percentage change over the trailing `sessions` trading days
fn trailing_change(closes: &[f64], sessions: usize) -> Option<f64> {
    if closes.len() <= sessions {
        return None;
    }
    let then = closes[closes.len() - 1 - sessions];
    let now = *closes.last()?;
    if then == 0.0 {
        return None;
    }
    Some((now - then) / then * 100.0)
}

/// Annualized standard deviation of daily log returns
fn realized_volatility(closes: &[f64]) -> Option<f64> {
    if closes.len() < 3 {
        return None;
    }
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0)
        .map(|w| (w[1] / w[0]).ln())
        .collect();
    if returns.len() < 2 {
        return None;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    Some(variance.sqrt() * 252.0_f64.sqrt())
}

/// Score a headline in [-1, 1] from lexicon hits
fn score_headline(headline: &str) -> f64 {
    let lower = headline.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let positive = words.iter().filter(|w| POSITIVE_WORDS.contains(w)).count();
    let negative = words.iter().filter(|w| NEGATIVE_WORDS.contains(w)).count();

    if positive + negative == 0 {
        return 0.0;
    }
    (positive as f64 - negative as f64) / (positive + negative) as f64
}

fn sentiment_label(score: f64) -> &'static str {
    if score > 0.15 {
        "positive"
    } else if score < -0.15 {
        "negative"
    } else {
        "neutral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_series_short_history() {
        assert!(sma_series(&[1.0, 2.0], 20).is_none());
    }

    #[test]
    fn test_sma_series_constant_prices() {
        let closes = vec![10.0; 30];
        let series = sma_series(&closes, 20).unwrap();
        assert_eq!(series.len(), 30);
        assert!((series[29] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_trailing_change() {
        let closes: Vec<f64> = (1..=30).map(f64::from).collect();
        let change = trailing_change(&closes, 21).unwrap();
        // last close 30 against close 21 sessions back (9)
        assert!((change - ((30.0 - 9.0) / 9.0 * 100.0)).abs() < 1e-9);
        assert!(trailing_change(&closes, 30).is_none());
    }

    #[test]
    fn test_realized_volatility_flat_series_is_zero() {
        let closes = vec![100.0; 20];
        let vol = realized_volatility(&closes).unwrap();
        assert!(vol.abs() < 1e-12);
    }

    #[test]
    fn test_score_headline() {
        assert!(score_headline("Shares surge after record profit") > 0.0);
        assert!(score_headline("Stock plunges on earnings miss and layoffs") < 0.0);
        assert!((score_headline("Company announces annual meeting")).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sentiment_label_thresholds() {
        assert_eq!(sentiment_label(0.5), "positive");
        assert_eq!(sentiment_label(-0.5), "negative");
        assert_eq!(sentiment_label(0.05), "neutral");
    }

    #[test]
    fn test_missing_keys_surface_config_errors() {
        let source = LiveMarketData::new(MarketConfig::default()).unwrap();
        assert!(source.fred().is_err());
        assert!(source.finnhub().is_err());
    }
}
