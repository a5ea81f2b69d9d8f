use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    error::{FlowError, Result},
    storage::Session,
    task::{Flow, NextAction, Task},
};

/// A set of page tasks plus the table of forward transitions between them
pub struct Graph<F: Flow> {
    pub id: String,
    tasks: HashMap<F::Page, Arc<dyn Task<F>>>,
    edges: HashMap<F::Page, F::Page>,
    start_page: F::Page,
}

impl<F: Flow> Graph<F> {
    /// The page new sessions start on
    pub fn start_page(&self) -> F::Page {
        self.start_page
    }

    /// Get a task by page
    pub fn get_task(&self, page: F::Page) -> Option<Arc<dyn Task<F>>> {
        self.tasks.get(&page).cloned()
    }

    /// Resolve where `action` taken on `from` leads.
    pub fn transition(&self, from: F::Page, action: NextAction) -> Result<F::Page> {
        match action {
            NextAction::Continue => self
                .edges
                .get(&from)
                .copied()
                .ok_or_else(|| FlowError::NoTransition(format!("{from:?}"))),
            NextAction::WaitForInput | NextAction::End => Ok(from),
        }
    }

    /// Execute exactly one step: run the task for the session's current page and
    /// apply the resulting transition.
    pub async fn execute_session(
        &self,
        session: &mut Session<F>,
        input: F::Input,
    ) -> Result<ExecutionResult<F::Page>> {
        let page = session.page;
        let task = self
            .tasks
            .get(&page)
            .ok_or_else(|| FlowError::TaskNotFound(format!("{page:?}")))?;

        debug!(session_id = %session.id, page = ?page, input = ?input, "running task");
        let result = task.run(&mut session.data, input).await?;
        let next_page = self.transition(page, result.next_action)?;

        if next_page != page {
            info!(session_id = %session.id, from = ?page, to = ?next_page, "page transition");
        }

        session.page = next_page;
        session.status_message = result.status_message;
        session.warning = result.warning.clone();

        let status = match result.next_action {
            NextAction::End => ExecutionStatus::Completed,
            NextAction::Continue | NextAction::WaitForInput => ExecutionStatus::WaitingForInput,
        };

        Ok(ExecutionResult {
            response: result.response,
            warning: result.warning,
            page: next_page,
            status,
        })
    }
}

/// Builder for creating graphs
pub struct GraphBuilder<F: Flow> {
    id: String,
    tasks: HashMap<F::Page, Arc<dyn Task<F>>>,
    edges: HashMap<F::Page, F::Page>,
    start_page: Option<F::Page>,
    error: Option<FlowError>,
}

impl<F: Flow> GraphBuilder<F> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: HashMap::new(),
            edges: HashMap::new(),
            start_page: None,
            error: None,
        }
    }

    /// Add a task. The first task added becomes the start page.
    pub fn add_task(mut self, task: Arc<dyn Task<F>>) -> Self {
        let page = task.page();
        if self.tasks.contains_key(&page) {
            self.error
                .get_or_insert(FlowError::DuplicateTask(format!("{page:?}")));
            return self;
        }
        self.start_page.get_or_insert(page);
        self.tasks.insert(page, task);
        self
    }

    /// Add the forward edge taken when the task on `from` returns `Continue`.
    pub fn add_edge(mut self, from: F::Page, to: F::Page) -> Self {
        if self.edges.contains_key(&from) {
            self.error
                .get_or_insert(FlowError::DuplicateEdge(format!("{from:?}")));
            return self;
        }
        self.edges.insert(from, to);
        self
    }

    pub fn set_start_page(mut self, page: F::Page) -> Self {
        self.start_page = Some(page);
        self
    }

    pub fn build(self) -> Result<Graph<F>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let start_page = self.start_page.ok_or(FlowError::MissingStartPage)?;
        if !self.tasks.contains_key(&start_page) {
            return Err(FlowError::TaskNotFound(format!("{start_page:?}")));
        }
        for (from, to) in &self.edges {
            if !self.tasks.contains_key(from) {
                return Err(FlowError::TaskNotFound(format!("{from:?}")));
            }
            if !self.tasks.contains_key(to) {
                return Err(FlowError::TaskNotFound(format!("{to:?}")));
            }
        }

        Ok(Graph {
            id: self.id,
            tasks: self.tasks,
            edges: self.edges,
            start_page,
        })
    }
}

/// Status of graph execution
#[derive(Debug, Clone)]
pub struct ExecutionResult<P> {
    pub response: Option<String>,
    pub warning: Option<String>,
    /// The page the session is on after this step
    pub page: P,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Waiting for user input to continue
    WaitingForInput,
    /// The session reached its terminal page
    Completed,
}
