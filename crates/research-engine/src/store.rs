//! Durable-store seam for query records and sessions
//!
//! The engine persists query records and reads sessions through this trait;
//! a real deployment points it at a database, while [`MemoryStore`] backs a
//! single process. Read-after-write consistency is assumed within the
//! process.

use crate::error::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use research_core::{QueryRecord, Session};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence operations the engine depends on
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Upsert a query record by id
    async fn save_record(&self, record: &QueryRecord) -> Result<()>;

    /// Read a query record by id
    async fn get_record(&self, id: &str) -> Result<Option<QueryRecord>>;

    /// Read a session by id
    async fn load_session(&self, session_id: &str) -> Result<Option<Session>>;
}

/// In-memory store for a single service instance
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, QueryRecord>>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a session, for local runs and tests
    pub async fn put_session(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
    }

    /// Number of persisted records
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl QueryStore for MemoryStore {
    async fn save_record(&self, record: &QueryRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<QueryRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn load_session(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }
}
