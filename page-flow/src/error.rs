use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("No task registered for page: {0}")]
    TaskNotFound(String),

    #[error("No transition leaves page: {0}")]
    NoTransition(String),

    #[error("A task is already registered for page: {0}")]
    DuplicateTask(String),

    #[error("An edge already leaves page: {0}")]
    DuplicateEdge(String),

    #[error("Graph has no start page")]
    MissingStartPage,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Page {page} does not accept input: {input}")]
    UnsupportedInput { page: String, input: String },

    #[error("Task execution failed: {0}")]
    TaskExecutionFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
