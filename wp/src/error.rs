//! Selection error types

use thiserror::Error;

use crate::domain::WorkerHandle;

/// Errors a selection can surface to its caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    /// No pool is registered for the topic yet; bootstrap has been triggered
    #[error("No worker pool registered for topic {topic}")]
    Picking { topic: String },

    /// The pool exists but no worker is ready
    #[error("Worker pool for topic {topic} is still bootstrapping")]
    Bootstrapping { topic: String },

    /// The request does not match what this coordinator serves
    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Coordinator channel closed")]
    ChannelClosed,
}

impl PickError {
    /// Check if the caller should simply try again shortly
    pub fn is_retryable(&self) -> bool {
        match self {
            PickError::Picking { .. } => true,
            PickError::Bootstrapping { .. } => true,
            PickError::Malformed(_) => false,
            PickError::ChannelClosed => false,
        }
    }
}

/// Outcome of a selection: the worker to publish to, or why there is none
pub type Selection = Result<WorkerHandle, PickError>;
