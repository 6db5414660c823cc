//! Execution context handed to the answering capability
//!
//! [`SessionContext`] is a flexible key-value store carrying per-invocation
//! state (user, session, mode, verbosity) across the executor/adapter seam.

use crate::query::{QueryMode, Verbosity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Well-known context keys
pub mod keys {
    /// User ID the query runs as
    pub const USER_ID: &str = "user_id";
    /// Session ID the query runs under
    pub const SESSION_ID: &str = "session_id";
    /// Provider-selection mode
    pub const MODE: &str = "mode";
    /// Requested verbosity
    pub const VERBOSITY: &str = "verbosity";
    /// Session display title, when the store has one
    pub const SESSION_TITLE: &str = "session_title";
    /// Language preference (e.g. "en")
    pub const LANGUAGE: &str = "language";
}

/// Key-value execution context
///
/// # Example
///
/// ```
/// use research_core::SessionContext;
///
/// let ctx = SessionContext::new()
///     .with_user_id("u-1")
///     .with_session_id("s-1");
///
/// assert_eq!(ctx.user_id(), Some("u-1"));
/// assert_eq!(ctx.session_id(), Some("s-1"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    data: HashMap<String, serde_json::Value>,
}

impl SessionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user ID
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.insert(keys::USER_ID, serde_json::json!(user_id.into()));
        self
    }

    /// Set the session ID
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.insert(keys::SESSION_ID, serde_json::json!(session_id.into()));
        self
    }

    /// Set the provider-selection mode
    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.insert(keys::MODE, serde_json::json!(mode));
        self
    }

    /// Set the verbosity
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.insert(keys::VERBOSITY, serde_json::json!(verbosity));
        self
    }

    /// Set the session title
    pub fn with_session_title(mut self, title: impl Into<String>) -> Self {
        self.insert(keys::SESSION_TITLE, serde_json::json!(title.into()));
        self
    }

    /// Get the user ID
    pub fn user_id(&self) -> Option<&str> {
        self.get(keys::USER_ID).and_then(|v| v.as_str())
    }

    /// Get the session ID
    pub fn session_id(&self) -> Option<&str> {
        self.get(keys::SESSION_ID).and_then(|v| v.as_str())
    }

    /// Get the provider-selection mode
    pub fn mode(&self) -> QueryMode {
        self.get(keys::MODE)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Get the verbosity
    pub fn verbosity(&self) -> Verbosity {
        self.get(keys::VERBOSITY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Insert a raw value
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Insert a typed value, serializing it to JSON
    pub fn insert_typed<T: serde::Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> crate::Result<()> {
        let json_value = serde_json::to_value(value)?;
        self.data.insert(key.into(), json_value);
        Ok(())
    }

    /// Read a typed value, deserializing it from JSON
    pub fn get_typed<T: for<'de> serde::Deserialize<'de>>(
        &self,
        key: &str,
    ) -> crate::Result<Option<T>> {
        match self.data.get(key) {
            None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }

    /// Read a raw value
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the context holds no entries
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let ctx = SessionContext::new()
            .with_user_id("u-9")
            .with_session_id("s-9")
            .with_mode(QueryMode::Deep)
            .with_verbosity(Verbosity::Brief);

        assert_eq!(ctx.user_id(), Some("u-9"));
        assert_eq!(ctx.session_id(), Some("s-9"));
        assert_eq!(ctx.mode(), QueryMode::Deep);
        assert_eq!(ctx.verbosity(), Verbosity::Brief);
    }

    #[test]
    fn test_defaults_when_unset() {
        let ctx = SessionContext::new();
        assert!(ctx.is_empty());
        assert_eq!(ctx.mode(), QueryMode::Auto);
        assert_eq!(ctx.verbosity(), Verbosity::Standard);
    }

    #[test]
    fn test_typed_roundtrip() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Extra {
            weight: u32,
        }

        let mut ctx = SessionContext::new();
        ctx.insert_typed("extra", &Extra { weight: 7 }).unwrap();

        let back: Extra = ctx.get_typed("extra").unwrap().unwrap();
        assert_eq!(back, Extra { weight: 7 });

        let missing: Option<Extra> = ctx.get_typed("absent").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_raw_access() {
        let mut ctx = SessionContext::new();
        ctx.insert("custom", serde_json::json!(42));
        assert!(ctx.contains_key("custom"));
        assert_eq!(ctx.get("custom"), Some(&serde_json::json!(42)));
        assert_eq!(ctx.len(), 1);
    }
}
