//! Task lifecycle state machine.
//!
//! Every process-backed task moves through [`TaskState`]:
//!
//! ```text
//! Created -> Running
//! Running -> Completed, Cancelled, Failed
//! Completed -> (terminal, no transitions)
//! Cancelled -> (terminal, no transitions)
//! Failed    -> (terminal, no transitions)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TaskError;

/// Lifecycle state of a process-backed task.
///
/// Terminal states (`Completed`, `Cancelled`, `Failed`) reject all
/// transitions. Self-transitions are rejected.
///
/// # Examples
///
/// ```
/// use sketch_tasks::TaskState;
///
/// let state = TaskState::Running;
/// assert!(!state.is_terminal());
/// assert!(state.can_transition_to(&TaskState::Completed));
/// assert!(!state.can_transition_to(&TaskState::Running));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Constructed but not started.
    Created,
    /// Child process launched (or about to be) and output being read.
    Running,
    /// Output stream ended without a cancellation request (terminal).
    Completed,
    /// Cancellation was observed before the output stream closed (terminal).
    Cancelled,
    /// The process could not be spawned or its output could not be read (terminal).
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl TaskState {
    /// Returns `true` if this state is terminal (no further transitions allowed).
    ///
    /// # Examples
    ///
    /// ```
    /// use sketch_tasks::TaskState;
    ///
    /// assert!(!TaskState::Created.is_terminal());
    /// assert!(!TaskState::Running.is_terminal());
    /// assert!(TaskState::Completed.is_terminal());
    /// assert!(TaskState::Cancelled.is_terminal());
    /// assert!(TaskState::Failed.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Returns `true` if transitioning from this state to `next` is valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use sketch_tasks::TaskState;
    ///
    /// assert!(TaskState::Created.can_transition_to(&TaskState::Running));
    /// assert!(!TaskState::Created.can_transition_to(&TaskState::Completed));
    /// assert!(!TaskState::Cancelled.can_transition_to(&TaskState::Running));
    /// ```
    pub fn can_transition_to(&self, next: &Self) -> bool {
        match self {
            Self::Created => matches!(next, Self::Running),
            Self::Running => matches!(next, Self::Completed | Self::Cancelled | Self::Failed),
            Self::Completed | Self::Cancelled | Self::Failed => false,
        }
    }

    /// Validates a transition from this state to `next`.
    ///
    /// Returns `Ok(())` if the transition is valid, or a
    /// [`TaskError::InvalidTransition`] naming the rejected transition.
    ///
    /// # Examples
    ///
    /// ```
    /// use sketch_tasks::TaskState;
    ///
    /// assert!(TaskState::Running
    ///     .validate_transition("task-1", &TaskState::Failed)
    ///     .is_ok());
    /// assert!(TaskState::Failed
    ///     .validate_transition("task-1", &TaskState::Running)
    ///     .is_err());
    /// ```
    pub fn validate_transition(&self, task_id: &str, next: &Self) -> Result<(), TaskError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(TaskError::InvalidTransition {
                task_id: task_id.to_string(),
                from: *self,
                to: *next,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde_names() {
        for state in [
            TaskState::Created,
            TaskState::Running,
            TaskState::Completed,
            TaskState::Cancelled,
            TaskState::Failed,
        ] {
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json, state.to_string());
        }
    }

    #[test]
    fn rejected_transition_carries_context() {
        let err = TaskState::Completed
            .validate_transition("proj:Release", &TaskState::Running)
            .unwrap_err();
        match err {
            TaskError::InvalidTransition { task_id, from, to } => {
                assert_eq!(task_id, "proj:Release");
                assert_eq!(from, TaskState::Completed);
                assert_eq!(to, TaskState::Running);
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
