//! Error types for the conversational core.

use swachtrack_core::error::SwachError;

/// Errors from the pipeline steps, gateway and orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("malformed model output: {0}")]
    MalformedOutput(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid tool arguments: {0}")]
    InvalidToolArguments(String),
    #[error("session store error: {0}")]
    Session(String),
}

impl ChatError {
    /// Whether the caller supplied bad input (as opposed to an upstream fault).
    pub fn is_validation(&self) -> bool {
        matches!(self, ChatError::MissingField(_) | ChatError::EmptyMessage)
    }
}

impl From<ChatError> for SwachError {
    fn from(err: ChatError) -> Self {
        if err.is_validation() {
            SwachError::Validation(err.to_string())
        } else {
            SwachError::Upstream(err.to_string())
        }
    }
}
