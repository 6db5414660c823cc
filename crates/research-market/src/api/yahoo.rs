//! Yahoo Finance API client
//!
//! Price history and latest quotes go through the `yahoo_finance_api` crate;
//! the options chain and earnings dates use the public query endpoints
//! directly.

use crate::error::{MarketError, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

const YAHOO_QUERY_BASE: &str = "https://query2.finance.yahoo.com";

/// One OHLCV bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adjclose: f64,
}

/// Yahoo Finance client
pub struct YahooClient {
    http: reqwest::Client,
}

impl YahooClient {
    /// Create a new client
    pub fn new(request_timeout: std::time::Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(MarketError::NetworkError)?;
        Ok(Self { http })
    }

    /// Get the latest daily quote for a ticker
    pub async fn latest_bar(&self, ticker: &str) -> Result<Bar> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| MarketError::ApiError(format!("Yahoo connector: {e}")))?;

        let response = provider
            .get_latest_quotes(ticker, "1d")
            .await
            .map_err(|e| MarketError::ApiError(format!("Yahoo quotes: {e}")))?;

        let quote = response
            .last_quote()
            .map_err(|e| MarketError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self::bar_from_quote(ticker, &quote))
    }

    /// Get historical daily bars between two instants
    pub async fn history(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| MarketError::ApiError(format!("Yahoo connector: {e}")))?;

        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| MarketError::ApiError(format!("invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| MarketError::ApiError(format!("invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(ticker, start_odt, end_odt)
            .await
            .map_err(|e| MarketError::ApiError(format!("Yahoo history: {e}")))?;

        let quotes = response.quotes().map_err(|e| MarketError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: e.to_string(),
        })?;

        Ok(quotes
            .iter()
            .map(|q| Self::bar_from_quote(ticker, q))
            .collect())
    }

    /// Get historical daily bars for a named range ("1mo", "3mo", "1y", ...)
    pub async fn history_range(&self, ticker: &str, range: &str) -> Result<Vec<Bar>> {
        let end = Utc::now();
        let start = match range {
            "5d" => end - chrono::Duration::days(5),
            "1mo" => end - chrono::Duration::days(30),
            "3mo" => end - chrono::Duration::days(90),
            "6mo" => end - chrono::Duration::days(180),
            "1y" => end - chrono::Duration::days(365),
            "2y" => end - chrono::Duration::days(730),
            "5y" => end - chrono::Duration::days(1825),
            "ytd" => {
                let year = end.year();
                chrono::NaiveDate::from_ymd_opt(year, 1, 1)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| d.and_utc())
                    .unwrap_or(end - chrono::Duration::days(365))
            }
            _ => {
                return Err(MarketError::ApiError(format!("invalid range: {range}")));
            }
        };

        self.history(ticker, start, end).await
    }

    /// Summarize the near-dated options chain for a ticker
    ///
    /// Returns call/put volume and open interest for the front expiry.
    pub async fn options_summary(&self, ticker: &str) -> Result<serde_json::Value> {
        let url = format!("{YAHOO_QUERY_BASE}/v7/finance/options/{ticker}");
        let body: serde_json::Value = self.get_json(&url, ticker).await?;

        let chain = body
            .pointer("/optionChain/result/0")
            .ok_or_else(|| MarketError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: "no options chain".to_string(),
            })?;

        let sum = |contracts: Option<&serde_json::Value>, field: &str| -> u64 {
            contracts
                .and_then(|c| c.as_array())
                .map(|list| {
                    list.iter()
                        .filter_map(|c| c.get(field).and_then(serde_json::Value::as_u64))
                        .sum()
                })
                .unwrap_or(0)
        };

        let options = chain.pointer("/options/0");
        let calls = options.and_then(|o| o.get("calls"));
        let puts = options.and_then(|o| o.get("puts"));

        let call_volume = sum(calls, "volume");
        let put_volume = sum(puts, "volume");
        let ratio = if call_volume > 0 {
            put_volume as f64 / call_volume as f64
        } else {
            0.0
        };

        Ok(serde_json::json!({
            "ticker": ticker,
            "expiry": options.and_then(|o| o.get("expirationDate")).cloned(),
            "call_volume": call_volume,
            "put_volume": put_volume,
            "call_open_interest": sum(calls, "openInterest"),
            "put_open_interest": sum(puts, "openInterest"),
            "put_call_ratio": ratio,
        }))
    }

    /// Fetch upcoming and trailing earnings dates for a ticker
    pub async fn earnings_dates(&self, ticker: &str) -> Result<serde_json::Value> {
        let url = format!(
            "{YAHOO_QUERY_BASE}/v10/finance/quoteSummary/{ticker}?modules=calendarEvents,earningsHistory"
        );
        let body: serde_json::Value = self.get_json(&url, ticker).await?;

        let result = body
            .pointer("/quoteSummary/result/0")
            .ok_or_else(|| MarketError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: "no calendar data".to_string(),
            })?;

        Ok(serde_json::json!({
            "ticker": ticker,
            "next_earnings": result.pointer("/calendarEvents/earnings/earningsDate").cloned(),
            "history": result.pointer("/earningsHistory/history").cloned(),
        }))
    }

    async fn get_json(&self, url: &str, ticker: &str) -> Result<serde_json::Value> {
        let response = self
            .http
            .get(url)
            .header("user-agent", "Mozilla/5.0 (research-rs)")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: format!("Yahoo query returned {}", response.status()),
            });
        }

        Ok(response.json().await?)
    }

    fn bar_from_quote(ticker: &str, quote: &yahoo::Quote) -> Bar {
        Bar {
            ticker: ticker.to_string(),
            timestamp: DateTime::from_timestamp(quote.timestamp as i64, 0)
                .unwrap_or_else(Utc::now),
            open: quote.open,
            high: quote.high,
            low: quote.low,
            close: quote.close,
            volume: quote.volume,
            adjclose: quote.adjclose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client() -> YahooClient {
        YahooClient::new(Duration::from_secs(30)).unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_latest_bar() {
        let bar = client().latest_bar("AAPL").await.unwrap();
        assert_eq!(bar.ticker, "AAPL");
        assert!(bar.close > 0.0);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_history_range() {
        let bars = client().history_range("AAPL", "1mo").await.unwrap();
        assert!(!bars.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_range_is_rejected() {
        let result = client().history_range("AAPL", "100y").await;
        assert!(matches!(result, Err(MarketError::ApiError(_))));
    }
}
