//! Error types and result utilities for the streamer.

use thiserror::Error;

use crate::config::ConfigError;
use crate::streaming::StreamError;

/// Convenience type alias for results that may contain a [`MicStreamError`].
pub type MicStreamResult<T> = Result<T, MicStreamError>;

/// Top-level errors surfaced by the streamer.
///
/// Errors raised inside the pipeline tasks are contained by the component
/// that owns them; only startup failures and fatal task exits reach this
/// type.
#[derive(Error, Debug)]
pub enum MicStreamError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A pipeline task terminated with a fatal streaming error.
    #[error("Streaming error: {0}")]
    Stream(#[from] StreamError),

    /// Process-level I/O failure (signal handling, runtime setup).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline task panicked or was aborted before it could report.
    #[error("Task '{task}' did not complete: {reason}")]
    TaskJoin {
        /// Name of the task that failed to join.
        task: &'static str,
        /// Description from the runtime.
        reason: String,
    },
}

impl MicStreamError {
    /// Create a join error for the named task.
    pub fn task_join(task: &'static str, reason: impl Into<String>) -> Self {
        Self::TaskJoin {
            task,
            reason: reason.into(),
        }
    }
}
