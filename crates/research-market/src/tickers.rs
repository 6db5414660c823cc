//! Ticker mention extraction from free-form text

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Words that look like tickers but almost never are
const STOP_WORDS: &[&str] = &[
    "A", "I", "AM", "AN", "AND", "ARE", "AT", "BE", "BUY", "CEO", "CFO", "DO", "EPS", "ETF", "EU",
    "FED", "FOR", "GDP", "IN", "IPO", "IS", "IT", "ME", "NOT", "OF", "ON", "OR", "PE", "Q", "SEC",
    "SELL", "SO", "THE", "TO", "US", "USA", "VS", "WHAT", "WHY", "YOY",
];

fn dollar_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$([A-Za-z]{1,5})\b").unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

fn bare_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b([A-Z]{1,5})\b").unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

/// Extract ticker mentions from text
///
/// Two forms are recognized: `$`-prefixed symbols in any case (`$aapl`), and
/// bare 1-5 letter uppercase words (`AAPL`) that survive the stop-word
/// filter. Results are uppercased, deduplicated, and ordered by first
/// mention; `$`-prefixed mentions come first since they are explicit.
pub fn extract_tickers(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tickers = Vec::new();

    for capture in dollar_pattern().captures_iter(text) {
        if let Some(symbol) = capture.get(1) {
            let symbol = symbol.as_str().to_uppercase();
            if seen.insert(symbol.clone()) {
                tickers.push(symbol);
            }
        }
    }

    for capture in bare_pattern().captures_iter(text) {
        if let Some(symbol) = capture.get(1) {
            let symbol = symbol.as_str();
            if STOP_WORDS.contains(&symbol) {
                continue;
            }
            if seen.insert(symbol.to_string()) {
                tickers.push(symbol.to_string());
            }
        }
    }

    tickers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_uppercase_symbols() {
        let tickers = extract_tickers("Analyze AAPL and GOOGL for me");
        assert_eq!(tickers, vec!["AAPL", "GOOGL"]);
    }

    #[test]
    fn test_dollar_prefix_is_case_insensitive() {
        let tickers = extract_tickers("what about $msft and $Nvda?");
        assert_eq!(tickers, vec!["MSFT", "NVDA"]);
    }

    #[test]
    fn test_deduplication() {
        let tickers = extract_tickers("AAPL vs $aapl: is AAPL overvalued?");
        assert_eq!(tickers, vec!["AAPL"]);
    }

    #[test]
    fn test_stop_words_filtered() {
        let tickers = extract_tickers("WHY IS THE FED CUTTING? TSLA GDP EPS");
        assert_eq!(tickers, vec!["TSLA"]);
    }

    #[test]
    fn test_no_mentions() {
        assert!(extract_tickers("how are markets doing today?").is_empty());
    }

    #[test]
    fn test_explicit_mentions_come_first() {
        let tickers = extract_tickers("AMZN versus $shop over five years");
        assert_eq!(tickers, vec!["SHOP", "AMZN"]);
    }
}
