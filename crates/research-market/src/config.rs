//! Configuration for market-data operations

use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the enrichment data sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Cache TTL for quotes and price history
    pub cache_ttl_quotes: Duration,

    /// Cache TTL for reference data (filings, metrics, calendars)
    pub cache_ttl_reference: Duration,

    /// Cache TTL for news data
    pub cache_ttl_news: Duration,

    /// Request timeout for upstream APIs
    pub request_timeout: Duration,

    /// Default price-history range for chart fragments (e.g. "3mo")
    pub chart_range: String,

    /// Cap on related tickers enriched per query
    pub max_related_tickers: usize,

    /// FRED API key (macro cards; optional)
    pub fred_api_key: Option<String>,

    /// Finnhub API key (news and transcripts; optional)
    pub finnhub_api_key: Option<String>,

    /// User-Agent for SEC EDGAR (the SEC requires a contact string)
    pub edgar_user_agent: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            cache_ttl_quotes: Duration::from_secs(60),
            cache_ttl_reference: Duration::from_secs(3600),
            cache_ttl_news: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
            chart_range: "3mo".to_string(),
            max_related_tickers: 3,
            fred_api_key: None,
            finnhub_api_key: None,
            edgar_user_agent: "research-rs admin@research-rs.dev".to_string(),
        }
    }
}

impl MarketConfig {
    /// Create a configuration builder
    pub fn builder() -> MarketConfigBuilder {
        MarketConfigBuilder::default()
    }

    /// Load API keys from the environment
    ///
    /// Reads `FRED_API_KEY` and `FINNHUB_API_KEY`; unset keys leave the
    /// corresponding fragments unavailable.
    pub fn with_env_keys(mut self) -> Self {
        if let Some(key) = research_utils::optional_env("FRED_API_KEY") {
            self.fred_api_key = Some(key);
        }
        if let Some(key) = research_utils::optional_env("FINNHUB_API_KEY") {
            self.finnhub_api_key = Some(key);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.edgar_user_agent.trim().is_empty() {
            return Err(MarketError::ConfigError(
                "edgar_user_agent must not be empty (SEC fair-access policy)".to_string(),
            ));
        }
        if self.max_related_tickers > 10 {
            return Err(MarketError::ConfigError(
                "max_related_tickers must be 10 or fewer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for MarketConfig
#[derive(Debug, Default)]
pub struct MarketConfigBuilder {
    cache_ttl_quotes: Option<Duration>,
    cache_ttl_reference: Option<Duration>,
    cache_ttl_news: Option<Duration>,
    request_timeout: Option<Duration>,
    chart_range: Option<String>,
    max_related_tickers: Option<usize>,
    fred_api_key: Option<String>,
    finnhub_api_key: Option<String>,
    edgar_user_agent: Option<String>,
}

impl MarketConfigBuilder {
    /// Set the quotes cache TTL
    pub fn cache_ttl_quotes(mut self, duration: Duration) -> Self {
        self.cache_ttl_quotes = Some(duration);
        self
    }

    /// Set the reference-data cache TTL
    pub fn cache_ttl_reference(mut self, duration: Duration) -> Self {
        self.cache_ttl_reference = Some(duration);
        self
    }

    /// Set the news cache TTL
    pub fn cache_ttl_news(mut self, duration: Duration) -> Self {
        self.cache_ttl_news = Some(duration);
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the default chart range
    pub fn chart_range(mut self, range: impl Into<String>) -> Self {
        self.chart_range = Some(range.into());
        self
    }

    /// Set the related-ticker cap
    pub fn max_related_tickers(mut self, cap: usize) -> Self {
        self.max_related_tickers = Some(cap);
        self
    }

    /// Set the FRED API key
    pub fn fred_api_key(mut self, key: impl Into<String>) -> Self {
        self.fred_api_key = Some(key.into());
        self
    }

    /// Set the Finnhub API key
    pub fn finnhub_api_key(mut self, key: impl Into<String>) -> Self {
        self.finnhub_api_key = Some(key.into());
        self
    }

    /// Set the SEC EDGAR User-Agent contact string
    pub fn edgar_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.edgar_user_agent = Some(agent.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<MarketConfig> {
        let defaults = MarketConfig::default();

        let config = MarketConfig {
            cache_ttl_quotes: self.cache_ttl_quotes.unwrap_or(defaults.cache_ttl_quotes),
            cache_ttl_reference: self
                .cache_ttl_reference
                .unwrap_or(defaults.cache_ttl_reference),
            cache_ttl_news: self.cache_ttl_news.unwrap_or(defaults.cache_ttl_news),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            chart_range: self.chart_range.unwrap_or(defaults.chart_range),
            max_related_tickers: self
                .max_related_tickers
                .unwrap_or(defaults.max_related_tickers),
            fred_api_key: self.fred_api_key,
            finnhub_api_key: self.finnhub_api_key,
            edgar_user_agent: self.edgar_user_agent.unwrap_or(defaults.edgar_user_agent),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MarketConfig::default();
        assert_eq!(config.chart_range, "3mo");
        assert_eq!(config.max_related_tickers, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = MarketConfig::builder()
            .chart_range("1y")
            .max_related_tickers(5)
            .fred_api_key("test")
            .build()
            .unwrap();

        assert_eq!(config.chart_range, "1y");
        assert_eq!(config.max_related_tickers, 5);
        assert_eq!(config.fred_api_key.as_deref(), Some("test"));
    }

    #[test]
    fn test_validation_rejects_empty_user_agent() {
        let result = MarketConfig::builder().edgar_user_agent("  ").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_excessive_related_cap() {
        let result = MarketConfig::builder().max_related_tickers(50).build();
        assert!(result.is_err());
    }
}
