//! FlowRunner – convenience wrapper that loads a session, executes exactly **one** page step, and
//! persists the updated session back to storage.
//!
//! Interactive front ends deliver one user interaction per request. `FlowRunner` turns that into a
//! one-liner:
//!
//! ```rust,ignore
//! let result = state.flow_runner.run(&session_id, input).await?;
//! ```
//!
//! A step that fails leaves the stored session untouched, since the updated copy is only saved
//! once the task has returned successfully.
//!
//! Steps on the same session are serialized: each `run` holds a per-session lock from the load
//! until the save, so two concurrent requests never work from the same snapshot. Steps on
//! different sessions still run in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::{
    error::{FlowError, Result},
    graph::{ExecutionResult, Graph},
    storage::{Session, SessionStorage},
    task::Flow,
};

/// High-level helper that orchestrates the common _load → execute → save_ pattern.
pub struct FlowRunner<F: Flow> {
    graph: Arc<Graph<F>>,
    storage: Arc<dyn SessionStorage<F>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl<F: Flow> Clone for FlowRunner<F> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            storage: self.storage.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<F: Flow> FlowRunner<F> {
    pub fn new(graph: Arc<Graph<F>>, storage: Arc<dyn SessionStorage<F>>) -> Self {
        Self {
            graph,
            storage,
            locks: Arc::new(DashMap::new()),
        }
    }

    // The shard guard is dropped before the caller awaits the mutex.
    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn graph(&self) -> &Arc<Graph<F>> {
        &self.graph
    }

    /// Create and persist a fresh session on the graph's start page.
    pub async fn start(&self, session_id: impl Into<String>) -> Result<Session<F>> {
        let session = Session::new(session_id, self.graph.start_page());
        let lock = self.session_lock(&session.id);
        let _guard = lock.lock().await;
        self.storage.save(session.clone()).await?;
        Ok(session)
    }

    /// Load a session, honouring storage expiry.
    pub async fn load(&self, session_id: &str) -> Result<Session<F>> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))
    }

    /// Execute **exactly one** task for the given `session_id` and persist the updated session.
    pub async fn run(&self, session_id: &str, input: F::Input) -> Result<ExecutionResult<F::Page>> {
        let lock = self.session_lock(session_id);
        let guard = lock.lock().await;

        let mut session = match self.load(session_id).await {
            Ok(session) => session,
            Err(e) => {
                drop(guard);
                drop(lock);
                self.forget_lock(session_id);
                return Err(e);
            }
        };

        let result = self.graph.execute_session(&mut session, input).await?;

        session.touch();
        self.storage.save(session).await?;

        Ok(result)
    }

    // Only drops the entry when no other step is holding or waiting on it.
    fn forget_lock(&self, session_id: &str) {
        self.locks
            .remove_if(session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

