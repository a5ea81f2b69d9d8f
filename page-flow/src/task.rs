use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::Result;

/// Binds together the types a wizard is made of.
///
/// A flow is usually a zero-sized marker type; the pages, the per-session data record
/// and the input events all hang off it so that graphs, sessions and storage stay in sync.
pub trait Flow: Clone + Debug + Send + Sync + 'static {
    /// Identifier of a page. Every page has exactly one task.
    type Page: Copy + Eq + Hash + Debug + Send + Sync + 'static;
    /// The data a session accumulates while moving through the pages.
    type Data: Clone + Default + Debug + Send + Sync + 'static;
    /// One user interaction, delivered to the task of the current page.
    type Input: Debug + Send + 'static;
}

/// Result of a task execution
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Response to send to the user
    pub response: Option<String>,
    /// Next action to take
    pub next_action: NextAction,
    /// Optional status message describing the current state
    pub status_message: Option<String>,
    /// Validation warning shown inline; the page does not change
    pub warning: Option<String>,
}

impl TaskResult {
    pub fn new(response: Option<String>, next_action: NextAction) -> Self {
        Self {
            response,
            next_action,
            status_message: None,
            warning: None,
        }
    }

    pub fn new_with_status(
        response: Option<String>,
        next_action: NextAction,
        status_message: Option<String>,
    ) -> Self {
        Self {
            response,
            next_action,
            status_message,
            warning: None,
        }
    }

    /// Refuse to leave the page and surface `warning` to the user.
    pub fn rejected(warning: impl Into<String>) -> Self {
        Self {
            response: None,
            next_action: NextAction::WaitForInput,
            status_message: None,
            warning: Some(warning.into()),
        }
    }
}

/// Defines what should happen after a task completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Move to the page the transition table names for the current page
    Continue,
    /// Stay on the current page until the next input
    WaitForInput,
    /// The current page is terminal
    End,
}

/// A page handler. It alone decides whether its page is done.
#[async_trait]
pub trait Task<F: Flow>: Send + Sync {
    /// The page this task renders
    fn page(&self) -> F::Page;

    /// Handle one input, mutating only the session data this page owns
    async fn run(&self, data: &mut F::Data, input: F::Input) -> Result<TaskResult>;
}
