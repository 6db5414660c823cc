//! Per-user budget ledger: admission control and spend settlement
//!
//! One aggregate per user, guarded by a single async lock. Admission checks
//! never mutate; settlement is an atomic read-modify-write under the write
//! lock, so concurrent settlements for the same user cannot lose updates.
//! Day and month windows roll over lazily against the current UTC date.

use crate::error::{CapKind, EngineError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Default caps applied to users without explicit settings
pub const DEFAULT_DAILY_CAP: f64 = 25.0;
pub const DEFAULT_MONTHLY_CAP: f64 = 300.0;
pub const DEFAULT_SESSION_CAP: f64 = 10.0;
pub const DEFAULT_PER_QUERY_CAP: f64 = 2.5;

/// User-configurable spending caps; all values are positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetSettings {
    pub daily_cap: f64,
    pub monthly_cap: f64,
    pub session_cap: f64,
    pub per_query_cap: f64,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            daily_cap: DEFAULT_DAILY_CAP,
            monthly_cap: DEFAULT_MONTHLY_CAP,
            session_cap: DEFAULT_SESSION_CAP,
            per_query_cap: DEFAULT_PER_QUERY_CAP,
        }
    }
}

/// Partial update of budget settings; unset fields are unchanged
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BudgetPatch {
    pub daily_cap: Option<f64>,
    pub monthly_cap: Option<f64>,
    pub session_cap: Option<f64>,
    pub per_query_cap: Option<f64>,
}

/// Running spend totals for the current windows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetSpent {
    pub daily: f64,
    pub monthly: f64,
    /// Present only when the snapshot was scoped to a session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<f64>,
}

/// Headroom per cap, clamped at zero for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetRemaining {
    pub daily: f64,
    pub monthly: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<f64>,
}

/// Read-only view of one user's budget state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub settings: BudgetSettings,
    pub spent: BudgetSpent,
    pub remaining: BudgetRemaining,
    pub as_of: DateTime<Utc>,
}

/// Result of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied(CapKind),
}

/// One user's aggregate
#[derive(Debug, Clone)]
struct UserBudget {
    settings: BudgetSettings,
    day: NaiveDate,
    daily_spent: f64,
    month: (i32, u32),
    monthly_spent: f64,
    session_spent: HashMap<String, f64>,
}

impl UserBudget {
    fn new(settings: BudgetSettings, today: NaiveDate) -> Self {
        Self {
            settings,
            day: today,
            daily_spent: 0.0,
            month: (today.year(), today.month()),
            monthly_spent: 0.0,
            session_spent: HashMap::new(),
        }
    }

    /// Daily spend as of `today`, reading a stale window as zero
    fn daily_as_of(&self, today: NaiveDate) -> f64 {
        if self.day == today { self.daily_spent } else { 0.0 }
    }

    /// Monthly spend as of `today`, reading a stale window as zero
    fn monthly_as_of(&self, today: NaiveDate) -> f64 {
        if self.month == (today.year(), today.month()) {
            self.monthly_spent
        } else {
            0.0
        }
    }

    /// Reset stale windows before mutating
    fn roll(&mut self, today: NaiveDate) {
        if self.day != today {
            self.day = today;
            self.daily_spent = 0.0;
        }
        let month = (today.year(), today.month());
        if self.month != month {
            self.month = month;
            self.monthly_spent = 0.0;
        }
    }
}

/// Per-user spend ledger
pub struct BudgetLedger {
    entries: RwLock<HashMap<String, UserBudget>>,
    defaults: BudgetSettings,
}

impl BudgetLedger {
    /// Create a ledger with default caps for new users
    pub fn new(defaults: BudgetSettings) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            defaults,
        }
    }

    /// Decide whether an estimated spend may proceed
    ///
    /// Pure read: repeated calls are side-effect free. Comparisons are
    /// strict - a projection exactly meeting a cap is allowed. The
    /// projection uses unclamped headroom; an already-overspent window
    /// denies even a zero-cost estimate only when the estimate pushes it
    /// further over.
    pub async fn check_admission(
        &self,
        user_id: &str,
        session_id: &str,
        estimated_cost: f64,
    ) -> Admission {
        let today = Utc::now().date_naive();
        let entries = self.entries.read().await;

        let (settings, daily, monthly, session) = match entries.get(user_id) {
            Some(entry) => (
                entry.settings,
                entry.daily_as_of(today),
                entry.monthly_as_of(today),
                entry.session_spent.get(session_id).copied().unwrap_or(0.0),
            ),
            None => (self.defaults, 0.0, 0.0, 0.0),
        };

        if estimated_cost > settings.per_query_cap {
            return Admission::Denied(CapKind::PerQuery);
        }
        if session + estimated_cost > settings.session_cap {
            return Admission::Denied(CapKind::Session);
        }
        if daily + estimated_cost > settings.daily_cap {
            return Admission::Denied(CapKind::Daily);
        }
        if monthly + estimated_cost > settings.monthly_cap {
            return Admission::Denied(CapKind::Monthly);
        }
        Admission::Allowed
    }

    /// Settle an executed query's actual cost into the aggregates
    ///
    /// Atomic under the write lock; the caller applies it exactly once per
    /// executed query.
    pub async fn record_usage(&self, user_id: &str, session_id: &str, actual_cost: f64) {
        let today = Utc::now().date_naive();
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(user_id.to_string())
            .or_insert_with(|| UserBudget::new(self.defaults, today));

        entry.roll(today);
        entry.daily_spent += actual_cost;
        entry.monthly_spent += actual_cost;
        *entry
            .session_spent
            .entry(session_id.to_string())
            .or_insert(0.0) += actual_cost;

        tracing::debug!(
            user_id,
            session_id,
            actual_cost,
            daily_spent = entry.daily_spent,
            "usage recorded"
        );
    }

    /// Read-only snapshot of a user's budget state
    pub async fn snapshot(&self, user_id: &str, session_id: Option<&str>) -> BudgetSnapshot {
        let today = Utc::now().date_naive();
        let entries = self.entries.read().await;

        let (settings, daily, monthly, session) = match entries.get(user_id) {
            Some(entry) => (
                entry.settings,
                entry.daily_as_of(today),
                entry.monthly_as_of(today),
                session_id.map(|s| entry.session_spent.get(s).copied().unwrap_or(0.0)),
            ),
            None => (self.defaults, 0.0, 0.0, session_id.map(|_| 0.0)),
        };

        BudgetSnapshot {
            settings,
            spent: BudgetSpent {
                daily,
                monthly,
                session,
            },
            remaining: BudgetRemaining {
                daily: (settings.daily_cap - daily).max(0.0),
                monthly: (settings.monthly_cap - monthly).max(0.0),
                session: session.map(|s| (settings.session_cap - s).max(0.0)),
            },
            as_of: Utc::now(),
        }
    }

    /// Apply a partial settings update; values must stay positive
    pub async fn update_settings(
        &self,
        user_id: &str,
        patch: BudgetPatch,
    ) -> Result<BudgetSnapshot> {
        for (name, value) in [
            ("daily_cap", patch.daily_cap),
            ("monthly_cap", patch.monthly_cap),
            ("session_cap", patch.session_cap),
            ("per_query_cap", patch.per_query_cap),
        ] {
            if let Some(value) = value {
                if value <= 0.0 {
                    return Err(EngineError::Validation(format!(
                        "{name} must be positive, got {value}"
                    )));
                }
            }
        }

        {
            let today = Utc::now().date_naive();
            let mut entries = self.entries.write().await;
            let entry = entries
                .entry(user_id.to_string())
                .or_insert_with(|| UserBudget::new(self.defaults, today));

            if let Some(cap) = patch.daily_cap {
                entry.settings.daily_cap = cap;
            }
            if let Some(cap) = patch.monthly_cap {
                entry.settings.monthly_cap = cap;
            }
            if let Some(cap) = patch.session_cap {
                entry.settings.session_cap = cap;
            }
            if let Some(cap) = patch.per_query_cap {
                entry.settings.per_query_cap = cap;
            }
        }

        Ok(self.snapshot(user_id, None).await)
    }
}

impl Default for BudgetLedger {
    fn default() -> Self {
        Self::new(BudgetSettings::default())
    }
}
