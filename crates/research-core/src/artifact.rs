//! Enrichment artifact fragments
//!
//! An [`ArtifactBag`] is the sparse set of optional market-data fragments
//! attached to a query result. Every fragment is independently fetched and
//! independently absent; an empty slot is simply omitted from the serialized
//! form, never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The named enrichment fragments a result can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// Historical price series with indicator overlays
    PriceChart,
    /// Valuation and trading metrics for the ticker
    MetricSnapshot,
    /// Macroeconomic indicator cards
    MacroCards,
    /// Upcoming and recent earnings dates
    EarningsCalendar,
    /// Recent headlines with sentiment scores
    NewsSentiment,
    /// Options chain volume summary
    OptionsActivity,
    /// Recent regulatory filings
    FilingChanges,
    /// Earnings-call question-and-answer highlights
    TranscriptQa,
    /// Insider ownership filing cadence
    OwnershipTrend,
}

impl FragmentKind {
    /// All fragment kinds, in fetch order
    pub fn all() -> &'static [FragmentKind] {
        &[
            Self::PriceChart,
            Self::MetricSnapshot,
            Self::MacroCards,
            Self::EarningsCalendar,
            Self::NewsSentiment,
            Self::OptionsActivity,
            Self::FilingChanges,
            Self::TranscriptQa,
            Self::OwnershipTrend,
        ]
    }

    /// Stable key used in the serialized bag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceChart => "price_chart",
            Self::MetricSnapshot => "metric_snapshot",
            Self::MacroCards => "macro_cards",
            Self::EarningsCalendar => "earnings_calendar",
            Self::NewsSentiment => "news_sentiment",
            Self::OptionsActivity => "options_activity",
            Self::FilingChanges => "filing_changes",
            Self::TranscriptQa => "transcript_qa",
            Self::OwnershipTrend => "ownership_trend",
        }
    }
}

/// Sparse bag of optional enrichment fragments
///
/// Known fragments occupy typed slots; agent-produced raw fragments (tool
/// traces, source links) live in the flattened `extra` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_chart: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_snapshot: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_cards: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings_calendar: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_sentiment: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options_activity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filing_changes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_qa: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership_trend: Option<Value>,
    /// Raw fragments produced by the answering capability itself
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ArtifactBag {
    /// Store a fragment under its kind
    pub fn set(&mut self, kind: FragmentKind, value: Value) {
        *self.slot_mut(kind) = Some(value);
    }

    /// Read a fragment by kind
    pub fn get(&self, kind: FragmentKind) -> Option<&Value> {
        match kind {
            FragmentKind::PriceChart => self.price_chart.as_ref(),
            FragmentKind::MetricSnapshot => self.metric_snapshot.as_ref(),
            FragmentKind::MacroCards => self.macro_cards.as_ref(),
            FragmentKind::EarningsCalendar => self.earnings_calendar.as_ref(),
            FragmentKind::NewsSentiment => self.news_sentiment.as_ref(),
            FragmentKind::OptionsActivity => self.options_activity.as_ref(),
            FragmentKind::FilingChanges => self.filing_changes.as_ref(),
            FragmentKind::TranscriptQa => self.transcript_qa.as_ref(),
            FragmentKind::OwnershipTrend => self.ownership_trend.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: FragmentKind) -> &mut Option<Value> {
        match kind {
            FragmentKind::PriceChart => &mut self.price_chart,
            FragmentKind::MetricSnapshot => &mut self.metric_snapshot,
            FragmentKind::MacroCards => &mut self.macro_cards,
            FragmentKind::EarningsCalendar => &mut self.earnings_calendar,
            FragmentKind::NewsSentiment => &mut self.news_sentiment,
            FragmentKind::OptionsActivity => &mut self.options_activity,
            FragmentKind::FilingChanges => &mut self.filing_changes,
            FragmentKind::TranscriptQa => &mut self.transcript_qa,
            FragmentKind::OwnershipTrend => &mut self.ownership_trend,
        }
    }

    /// Number of populated fragments, `extra` entries included
    pub fn len(&self) -> usize {
        let typed = FragmentKind::all()
            .iter()
            .filter(|kind| self.get(**kind).is_some())
            .count();
        typed + self.extra.len()
    }

    /// Whether no fragment is populated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overlay another bag onto this one
    ///
    /// Populated slots in `other` win; empty slots leave existing fragments
    /// in place. `extra` entries are merged the same way.
    pub fn merge(&mut self, mut other: ArtifactBag) {
        for kind in FragmentKind::all() {
            if let Some(value) = other.slot_mut(*kind).take() {
                self.set(*kind, value);
            }
        }
        self.extra.extend(other.extra);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_bag() {
        let bag = ArtifactBag::default();
        assert!(bag.is_empty());
        assert_eq!(bag.len(), 0);
    }

    #[test]
    fn test_set_and_get() {
        let mut bag = ArtifactBag::default();
        bag.set(FragmentKind::PriceChart, json!({"points": 3}));

        assert_eq!(bag.len(), 1);
        assert_eq!(
            bag.get(FragmentKind::PriceChart),
            Some(&json!({"points": 3}))
        );
        assert!(bag.get(FragmentKind::NewsSentiment).is_none());
    }

    #[test]
    fn test_absent_fragments_are_omitted_from_json() {
        let mut bag = ArtifactBag::default();
        bag.set(FragmentKind::MetricSnapshot, json!({"pe": 31.2}));

        let json = serde_json::to_value(&bag).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object.contains_key("metric_snapshot"));
    }

    #[test]
    fn test_merge_prefers_populated_slots() {
        let mut base = ArtifactBag::default();
        base.set(FragmentKind::PriceChart, json!("old"));
        base.set(FragmentKind::MacroCards, json!("keep"));

        let mut overlay = ArtifactBag::default();
        overlay.set(FragmentKind::PriceChart, json!("new"));
        overlay
            .extra
            .insert("agent_sources".to_string(), json!(["https://a"]));

        base.merge(overlay);
        assert_eq!(base.get(FragmentKind::PriceChart), Some(&json!("new")));
        assert_eq!(base.get(FragmentKind::MacroCards), Some(&json!("keep")));
        assert_eq!(base.extra.len(), 1);
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn test_kind_keys_match_serialized_fields() {
        let mut bag = ArtifactBag::default();
        for kind in FragmentKind::all() {
            bag.set(*kind, json!(true));
        }
        let json = serde_json::to_value(&bag).unwrap();
        for kind in FragmentKind::all() {
            assert!(json.get(kind.as_str()).is_some(), "missing {kind:?}");
        }
    }
}
