use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{error::Result, task::Flow};

/// Session information
#[derive(Debug, Clone)]
pub struct Session<F: Flow> {
    pub id: String,
    pub page: F::Page,
    pub data: F::Data,
    pub status_message: Option<String>,
    /// Warning produced by the last step, cleared by the next one
    pub warning: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<F: Flow> Session<F> {
    pub fn new(id: impl Into<String>, page: F::Page) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            page,
            data: F::Data::default(),
            status_message: None,
            warning: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage<F: Flow>: Send + Sync {
    async fn save(&self, session: Session<F>) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Session<F>>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage.
///
/// With an idle TTL, a session untouched for longer than the TTL is gone: reads evict it
/// and report it as absent.
pub struct InMemorySessionStorage<F: Flow> {
    sessions: Arc<DashMap<String, Session<F>>>,
    ttl: Option<Duration>,
}

impl<F: Flow> InMemorySessionStorage<F> {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: None,
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: Some(ttl),
        }
    }

    fn is_expired(&self, session: &Session<F>, now: DateTime<Utc>) -> bool {
        self.ttl
            .map(|ttl| now - session.updated_at > ttl)
            .unwrap_or(false)
    }

    /// Drop every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !self.is_expired(session, now));
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<F: Flow> Default for InMemorySessionStorage<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<F: Flow> SessionStorage<F> for InMemorySessionStorage<F> {
    async fn save(&self, session: Session<F>) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session<F>>> {
        let now = Utc::now();
        let session = match self.sessions.get(id) {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };
        if self.is_expired(&session, now) {
            debug!(session_id = %id, "evicting expired session");
            self.sessions.remove(id);
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
