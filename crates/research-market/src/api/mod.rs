//! Upstream market-data API clients

pub mod edgar;
pub mod finnhub;
pub mod fred;
pub mod yahoo;

pub use edgar::EdgarClient;
pub use finnhub::FinnhubClient;
pub use fred::FredClient;
pub use yahoo::YahooClient;
