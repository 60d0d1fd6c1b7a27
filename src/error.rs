//! Error types for process-backed task operations.
//!
//! Provides [`TaskError`], a single error enum covering process creation,
//! output streaming, termination, queue bookkeeping and configuration.
//! Use [`kind`](TaskError::kind) to get a stable tag for terminal events.

use std::io;

use crate::types::state::TaskState;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TaskError>;

/// Errors that can occur while creating, running or managing a task.
///
/// Each variant carries contextual information (command, task ID, states)
/// to aid debugging.
///
/// # Examples
///
/// ```
/// use sketch_tasks::TaskError;
///
/// let err = TaskError::NotFound {
///     task_id: "missing-task".to_string(),
/// };
/// assert_eq!(err.kind(), "not_found");
/// assert!(err.to_string().contains("missing-task"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The child process could not be created.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// The executable that was being launched.
        command: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Reading the combined output stream failed after a successful spawn.
    #[error("failed to read process output: {source}")]
    StreamRead {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The OS refused to deliver the termination signal.
    #[error("failed to terminate process for task {task_id}: {source}")]
    TerminationRequestFailed {
        /// The task whose child could not be terminated.
        task_id: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Waiting for (reaping) the child process failed.
    #[error("failed to wait for process of task {task_id}: {source}")]
    Wait {
        /// The task whose child could not be reaped.
        task_id: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Attempted an invalid state machine transition.
    #[error("invalid transition from {from} to {to} for task {task_id}")]
    InvalidTransition {
        /// The task that was being transitioned.
        task_id: String,
        /// The current state of the task.
        from: TaskState,
        /// The target state that was rejected.
        to: TaskState,
    },

    /// A task with the same identity is already running on the queue.
    #[error("task already running: {task_id}")]
    DuplicateTask {
        /// The conflicting task ID.
        task_id: String,
    },

    /// No running task with the given identity.
    #[error("task not found: {task_id}")]
    NotFound {
        /// The task ID that was not found.
        task_id: String,
    },

    /// The task panicked while running on a queue worker.
    #[error("task {task_id} panicked: {message}")]
    Panicked {
        /// The task that panicked.
        task_id: String,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// Configuration could not be read, parsed or validated.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TaskError {
    /// Returns a stable snake_case tag for this error.
    ///
    /// Terminal events carry this tag so consumers can branch on a string
    /// rather than on a Rust type.
    ///
    /// # Examples
    ///
    /// ```
    /// use sketch_tasks::TaskError;
    ///
    /// let err = TaskError::Config("buffer_size must be positive".to_string());
    /// assert_eq!(err.kind(), "config");
    /// ```
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "spawn",
            Self::StreamRead { .. } => "stream_read",
            Self::TerminationRequestFailed { .. } => "termination_request_failed",
            Self::Wait { .. } => "wait",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::DuplicateTask { .. } => "duplicate_task",
            Self::NotFound { .. } => "not_found",
            Self::Panicked { .. } => "panicked",
            Self::Config(_) => "config",
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
