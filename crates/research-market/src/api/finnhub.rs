//! Finnhub API client for company news and earnings-call transcripts
//!
//! Free tier covers company news; transcripts require a premium key and
//! surface as a 403 that callers treat as fragment unavailability.
//! Rate limit: 60 requests per minute on the free tier.

use crate::error::{MarketError, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";
const FINNHUB_RATE_LIMIT_PER_MINUTE: u32 = 60;

/// One news article from Finnhub
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    /// Unix timestamp of publication
    #[serde(default)]
    pub datetime: i64,
}

/// Finnhub API client
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl FinnhubClient {
    /// Create a new Finnhub client
    pub fn new(api_key: impl Into<String>) -> Self {
        let per_minute = NonZeroU32::new(FINNHUB_RATE_LIMIT_PER_MINUTE).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            rate_limiter,
        }
    }

    /// Company news for a ticker over the trailing week
    pub async fn company_news(&self, ticker: &str) -> Result<Vec<NewsArticle>> {
        self.rate_limiter.until_ready().await;

        let to = chrono::Utc::now().date_naive();
        let from = to - chrono::Duration::days(7);
        let url = format!(
            "{FINNHUB_BASE_URL}/company-news?symbol={ticker}&from={from}&to={to}&token={}",
            self.api_key
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketError::ApiError(format!("Finnhub request failed: {e}")))?;

        if response.status().as_u16() == 429 {
            return Err(MarketError::RateLimitExceeded {
                provider: "Finnhub".to_string(),
            });
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MarketError::ApiError(format!(
                "Finnhub API error {status}: {body}"
            )));
        }

        response
            .json::<Vec<NewsArticle>>()
            .await
            .map_err(|e| MarketError::ApiError(format!("Failed to parse Finnhub response: {e}")))
    }

    /// Question-and-answer section of the most recent earnings-call transcript
    ///
    /// Premium endpoint; non-premium keys receive a 403 which surfaces as
    /// `DataUnavailable`.
    pub async fn latest_transcript_qa(&self, ticker: &str) -> Result<serde_json::Value> {
        self.rate_limiter.until_ready().await;

        let list_url = format!(
            "{FINNHUB_BASE_URL}/stock/transcripts/list?symbol={ticker}&token={}",
            self.api_key
        );

        let response = self
            .client
            .get(&list_url)
            .send()
            .await
            .map_err(|e| MarketError::ApiError(format!("Finnhub request failed: {e}")))?;

        if response.status().as_u16() == 403 {
            return Err(MarketError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: "transcripts require a premium Finnhub key".to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(MarketError::ApiError(format!(
                "Finnhub API error {}",
                response.status()
            )));
        }

        let listing: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MarketError::ApiError(format!("Failed to parse Finnhub response: {e}")))?;

        let transcript_id = listing
            .pointer("/transcripts/0/id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| MarketError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: "no transcripts listed".to_string(),
            })?;

        self.rate_limiter.until_ready().await;
        let transcript_url = format!(
            "{FINNHUB_BASE_URL}/stock/transcripts?id={transcript_id}&token={}",
            self.api_key
        );

        let transcript: serde_json::Value = self
            .client
            .get(&transcript_url)
            .send()
            .await
            .map_err(|e| MarketError::ApiError(format!("Finnhub request failed: {e}")))?
            .json()
            .await
            .map_err(|e| MarketError::ApiError(format!("Failed to parse Finnhub response: {e}")))?;

        // Keep only the Q&A exchanges; the prepared remarks are long and
        // rarely cited.
        let qa: Vec<serde_json::Value> = transcript
            .pointer("/transcript")
            .and_then(serde_json::Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| {
                        entry
                            .get("session")
                            .and_then(serde_json::Value::as_str)
                            .is_some_and(|s| s.eq_ignore_ascii_case("q&a"))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(serde_json::json!({
            "ticker": ticker,
            "transcript_id": transcript_id,
            "qa": qa,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = FinnhubClient::new("test_key");
        assert_eq!(client.api_key, "test_key");
    }

    #[test]
    fn test_article_parsing_tolerates_missing_fields() {
        let article: NewsArticle = serde_json::from_str(r#"{"headline": "x"}"#).unwrap();
        assert_eq!(article.headline, "x");
        assert!(article.url.is_empty());
    }
}
