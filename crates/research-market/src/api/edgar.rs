//! SEC EDGAR API client for filings and insider-ownership cadence
//!
//! EDGAR is the SEC's filing system. No API key is required, but requests
//! must carry a User-Agent with contact information and stay under
//! 10 requests per second per the fair-access policy.

use crate::error::{MarketError, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::RwLock;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const SEC_BASE_URL: &str = "https://data.sec.gov";
const SEC_COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const SEC_RATE_LIMIT_PER_SECOND: u32 = 10;

/// Recent-filings view of a company's submissions feed
#[derive(Debug, Clone, Default, Deserialize)]
struct RecentFilings {
    #[serde(default, rename = "accessionNumber")]
    accession_number: Vec<String>,
    #[serde(default)]
    form: Vec<String>,
    #[serde(default, rename = "filingDate")]
    filing_date: Vec<String>,
    #[serde(default, rename = "primaryDocument")]
    primary_document: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SubmissionsResponse {
    #[serde(default)]
    filings: Filings,
}

#[derive(Debug, Default, Deserialize)]
struct Filings {
    #[serde(default)]
    recent: RecentFilings,
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    cik_str: u64,
    ticker: String,
}

/// One filing row, flattened from the submissions feed
#[derive(Debug, Clone, serde::Serialize)]
pub struct Filing {
    pub accession_number: String,
    pub form: String,
    pub filing_date: String,
    pub primary_document: String,
}

/// SEC EDGAR client
pub struct EdgarClient {
    client: Client,
    user_agent: String,
    rate_limiter: SharedRateLimiter,
    cik_cache: RwLock<HashMap<String, String>>,
}

impl EdgarClient {
    /// Create a new EDGAR client
    ///
    /// `user_agent` must identify the caller per SEC policy, e.g.
    /// `"research-rs admin@example.com"`.
    pub fn new(user_agent: impl Into<String>) -> Self {
        let per_second = NonZeroU32::new(SEC_RATE_LIMIT_PER_SECOND).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Self {
            client: Client::new(),
            user_agent: user_agent.into(),
            rate_limiter,
            cik_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a ticker to its zero-padded CIK
    pub async fn resolve_cik(&self, ticker: &str) -> Result<String> {
        let upper = ticker.to_uppercase();

        if let Some(cik) = self.cik_cache.read().await.get(&upper) {
            return Ok(cik.clone());
        }

        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .get(SEC_COMPANY_TICKERS_URL)
            .header("user-agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| MarketError::ApiError(format!("EDGAR request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MarketError::ApiError(format!(
                "EDGAR ticker map error: {}",
                response.status()
            )));
        }

        let entries: HashMap<String, TickerEntry> = response
            .json()
            .await
            .map_err(|e| MarketError::ApiError(format!("Failed to parse ticker map: {e}")))?;

        let mut cache = self.cik_cache.write().await;
        for entry in entries.into_values() {
            cache.insert(entry.ticker.to_uppercase(), format!("{:010}", entry.cik_str));
        }

        cache
            .get(&upper)
            .cloned()
            .ok_or_else(|| MarketError::InvalidTicker(ticker.to_string()))
    }

    /// Recent filings for a ticker, newest first
    pub async fn recent_filings(&self, ticker: &str, limit: usize) -> Result<Vec<Filing>> {
        let cik = self.resolve_cik(ticker).await?;

        self.rate_limiter.until_ready().await;
        let url = format!("{SEC_BASE_URL}/submissions/CIK{cik}.json");
        let response = self
            .client
            .get(&url)
            .header("user-agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| MarketError::ApiError(format!("EDGAR request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MarketError::ApiError(format!(
                "EDGAR submissions error: {}",
                response.status()
            )));
        }

        let submissions: SubmissionsResponse = response
            .json()
            .await
            .map_err(|e| MarketError::ApiError(format!("Failed to parse submissions: {e}")))?;

        let recent = submissions.filings.recent;
        let rows = recent
            .accession_number
            .iter()
            .enumerate()
            .take(limit)
            .map(|(i, accession)| Filing {
                accession_number: accession.clone(),
                form: recent.form.get(i).cloned().unwrap_or_default(),
                filing_date: recent.filing_date.get(i).cloned().unwrap_or_default(),
                primary_document: recent.primary_document.get(i).cloned().unwrap_or_default(),
            })
            .collect();

        Ok(rows)
    }

    /// Disclosure filings (10-K/10-Q/8-K) from the recent feed
    pub async fn filing_changes(&self, ticker: &str) -> Result<serde_json::Value> {
        let filings = self.recent_filings(ticker, 100).await?;

        let disclosures: Vec<&Filing> = filings
            .iter()
            .filter(|f| matches!(f.form.as_str(), "10-K" | "10-Q" | "8-K"))
            .take(10)
            .collect();

        if disclosures.is_empty() {
            return Err(MarketError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: "no disclosure filings in recent feed".to_string(),
            });
        }

        Ok(serde_json::json!({
            "ticker": ticker,
            "filings": disclosures,
        }))
    }

    /// Insider filing cadence: Form 4 counts for the trailing two quarters
    pub async fn ownership_trend(&self, ticker: &str) -> Result<serde_json::Value> {
        let filings = self.recent_filings(ticker, 400).await?;
        let today = chrono::Utc::now().date_naive();
        let quarter_ago = today - chrono::Duration::days(90);
        let two_quarters_ago = today - chrono::Duration::days(180);

        let mut current_quarter = 0usize;
        let mut prior_quarter = 0usize;
        for filing in filings.iter().filter(|f| f.form == "4") {
            let Ok(date) = filing.filing_date.parse::<chrono::NaiveDate>() else {
                continue;
            };
            if date > quarter_ago {
                current_quarter += 1;
            } else if date > two_quarters_ago {
                prior_quarter += 1;
            }
        }

        let direction = match current_quarter.cmp(&prior_quarter) {
            std::cmp::Ordering::Greater => "rising",
            std::cmp::Ordering::Less => "falling",
            std::cmp::Ordering::Equal => "flat",
        };

        Ok(serde_json::json!({
            "ticker": ticker,
            "form4_current_quarter": current_quarter,
            "form4_prior_quarter": prior_quarter,
            "direction": direction,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = EdgarClient::new("research-rs test@example.com");
        assert_eq!(client.user_agent, "research-rs test@example.com");
    }

    #[test]
    fn test_submissions_parsing() {
        let raw = r#"{
            "filings": {"recent": {
                "accessionNumber": ["0000320193-25-000001"],
                "form": ["10-Q"],
                "filingDate": ["2025-05-02"],
                "primaryDocument": ["aapl-20250329.htm"]
            }}
        }"#;
        let parsed: SubmissionsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.filings.recent.form, vec!["10-Q"]);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_resolve_cik() {
        let client = EdgarClient::new("research-rs test@example.com");
        let cik = client.resolve_cik("AAPL").await.unwrap();
        assert_eq!(cik.len(), 10);
    }
}
