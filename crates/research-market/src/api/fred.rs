//! Federal Reserve Economic Data (FRED) API client
//!
//! FRED is maintained by the Federal Reserve Bank of St. Louis.
//! API keys are free: https://fred.stlouisfed.org/docs/api/api_key.html
//! Rate limit: 120 requests per minute.

use crate::error::{MarketError, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred";
const FRED_RATE_LIMIT_PER_MINUTE: u32 = 120;

/// FRED series IDs used by the macro cards fragment
pub mod series {
    /// Federal Funds Effective Rate
    pub const FED_FUNDS_RATE: &str = "FEDFUNDS";
    /// 10-Year Treasury Constant Maturity Rate
    pub const TREASURY_10Y: &str = "DGS10";
    /// 10Y-2Y Treasury Spread (Yield Curve)
    pub const YIELD_SPREAD_10Y_2Y: &str = "T10Y2Y";
    /// Unemployment Rate
    pub const UNEMPLOYMENT_RATE: &str = "UNRATE";
    /// Consumer Price Index (All Urban)
    pub const CPI: &str = "CPIAUCSL";
    /// Consumer Sentiment (U of Michigan)
    pub const CONSUMER_SENTIMENT: &str = "UMCSENT";
}

/// One observation of a FRED series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub date: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

/// FRED API client
pub struct FredClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl FredClient {
    /// Create a new FRED client
    pub fn new(api_key: impl Into<String>) -> Self {
        let per_minute = NonZeroU32::new(FRED_RATE_LIMIT_PER_MINUTE)
            .unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            rate_limiter,
        }
    }

    /// Latest numeric observation of a series, if one exists
    pub async fn latest_value(&self, series_id: &str) -> Result<Option<f64>> {
        let observations = self.observations(series_id, 5).await?;

        // FRED reports missing data points as "."
        Ok(observations
            .iter()
            .find_map(|obs| obs.value.parse::<f64>().ok()))
    }

    /// Most recent observations of a series, newest first
    pub async fn observations(&self, series_id: &str, limit: u32) -> Result<Vec<Observation>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{FRED_BASE_URL}/series/observations");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("series_id", series_id),
                ("api_key", &self.api_key),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| MarketError::ApiError(format!("FRED request failed: {e}")))?;

        if response.status().as_u16() == 429 {
            return Err(MarketError::RateLimitExceeded {
                provider: "FRED".to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(MarketError::ApiError(format!(
                "FRED API error: {}",
                response.status()
            )));
        }

        let data: ObservationsResponse = response
            .json()
            .await
            .map_err(|e| MarketError::ApiError(format!("Failed to parse FRED response: {e}")))?;

        Ok(data.observations)
    }

    /// Assemble the macro indicator cards
    ///
    /// Each card is fetched independently; a series that fails simply
    /// produces a null value on its card.
    pub async fn macro_cards(&self) -> Result<serde_json::Value> {
        let (fed_funds, treasury_10y, spread, unemployment, cpi, sentiment) = tokio::join!(
            self.latest_value(series::FED_FUNDS_RATE),
            self.latest_value(series::TREASURY_10Y),
            self.latest_value(series::YIELD_SPREAD_10Y_2Y),
            self.latest_value(series::UNEMPLOYMENT_RATE),
            self.latest_value(series::CPI),
            self.latest_value(series::CONSUMER_SENTIMENT),
        );

        let card = |label: &str, series: &str, value: Result<Option<f64>>| {
            serde_json::json!({
                "label": label,
                "series": series,
                "value": value.ok().flatten(),
            })
        };

        Ok(serde_json::json!({
            "as_of": chrono::Utc::now().to_rfc3339(),
            "cards": [
                card("Fed Funds Rate", series::FED_FUNDS_RATE, fed_funds),
                card("10Y Treasury", series::TREASURY_10Y, treasury_10y),
                card("10Y-2Y Spread", series::YIELD_SPREAD_10Y_2Y, spread),
                card("Unemployment", series::UNEMPLOYMENT_RATE, unemployment),
                card("CPI", series::CPI, cpi),
                card("Consumer Sentiment", series::CONSUMER_SENTIMENT, sentiment),
            ],
        }))
    }
}
