//! Notification types posted by tasks to their channel.
//!
//! A running task produces a stream of [`TaskNotification`] values: one
//! [`ProgressLine`] per delivered line of child output, followed by
//! exactly one [`TerminalEvent`] when the task leaves `Running`.
//!
//! # Serialization
//!
//! Notifications are internally tagged with a `type` field and use
//! `camelCase` field names so they can be forwarded to a UI as JSON
//! unchanged. `exitCode` and `error` serialize as `null` when absent.

use serde::{Deserialize, Serialize};

use crate::types::state::TaskState;

/// A single decoded line of child-process output.
///
/// The text has its line terminator stripped.
///
/// # Examples
///
/// ```
/// use sketch_tasks::ProgressLine;
///
/// let line = ProgressLine::new("proj:Release", "compiling main.cpp");
/// let json = serde_json::to_value(&line).unwrap();
/// assert_eq!(json["taskId"], "proj:Release");
/// assert_eq!(json["text"], "compiling main.cpp");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressLine {
    /// Identity of the originating task.
    pub task_id: String,

    /// Line text without its terminator.
    pub text: String,
}

impl ProgressLine {
    /// Creates a progress line for `task_id`.
    pub fn new(task_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            text: text.into(),
        }
    }
}

/// Final report of a task, posted once when it leaves `Running`.
///
/// `exit_code` is authoritative only when `state` is
/// [`TaskState::Completed`]. For `Cancelled` it is best-effort and may
/// differ across platforms; for `Failed` it may be absent.
///
/// # Examples
///
/// ```
/// use sketch_tasks::{TaskState, TerminalEvent};
///
/// let event = TerminalEvent {
///     task_id: "echo".to_string(),
///     state: TaskState::Completed,
///     exit_code: Some(0),
///     error: None,
/// };
/// assert!(event.is_success());
///
/// let json = serde_json::to_value(&event).unwrap();
/// assert_eq!(json["state"], "completed");
/// assert_eq!(json["exitCode"], 0);
/// assert!(json["error"].is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalEvent {
    /// Identity of the task.
    pub task_id: String,

    /// Terminal state reached.
    pub state: TaskState,

    /// Exit status of the child, when one was observed.
    pub exit_code: Option<i32>,

    /// Error that caused or accompanied the terminal state.
    pub error: Option<TaskFailure>,
}

impl TerminalEvent {
    /// Returns `true` when the task completed and the child exited with status 0.
    pub fn is_success(&self) -> bool {
        self.state == TaskState::Completed && self.exit_code == Some(0)
    }
}

/// Serializable description of a [`TaskError`](crate::TaskError).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFailure {
    /// Stable tag from [`TaskError::kind`](crate::TaskError::kind).
    pub kind: String,

    /// Human-readable message.
    pub message: String,
}

impl From<&crate::TaskError> for TaskFailure {
    fn from(err: &crate::TaskError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Anything a task posts to its notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskNotification {
    /// One line of child output.
    Line(ProgressLine),
    /// The task reached a terminal state.
    Terminal(TerminalEvent),
}

impl TaskNotification {
    /// Identity of the task this notification belongs to.
    pub fn task_id(&self) -> &str {
        match self {
            Self::Line(line) => &line.task_id,
            Self::Terminal(event) => &event.task_id,
        }
    }

    /// Returns `true` for [`TaskNotification::Terminal`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_notification_serialization() {
        let notification = TaskNotification::Line(ProgressLine::new("t1", "hello"));

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "line");
        assert_eq!(json["taskId"], "t1");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn terminal_notification_serialization() {
        let notification = TaskNotification::Terminal(TerminalEvent {
            task_id: "t2".to_string(),
            state: TaskState::Failed,
            exit_code: None,
            error: Some(TaskFailure {
                kind: "spawn".to_string(),
                message: "failed to spawn `nope`".to_string(),
            }),
        });

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "terminal");
        assert_eq!(json["state"], "failed");
        // exitCode must be present as null
        assert!(json.get("exitCode").is_some());
        assert!(json["exitCode"].is_null());
        assert_eq!(json["error"]["kind"], "spawn");
    }

    #[test]
    fn task_id_accessor() {
        let line = TaskNotification::Line(ProgressLine::new("a", "x"));
        assert_eq!(line.task_id(), "a");
        assert!(!line.is_terminal());

        let terminal = TaskNotification::Terminal(TerminalEvent {
            task_id: "b".to_string(),
            state: TaskState::Cancelled,
            exit_code: Some(137),
            error: None,
        });
        assert_eq!(terminal.task_id(), "b");
        assert!(terminal.is_terminal());
    }

    #[test]
    fn cancelled_is_never_success() {
        let event = TerminalEvent {
            task_id: "c".to_string(),
            state: TaskState::Cancelled,
            exit_code: Some(0),
            error: None,
        };
        assert!(!event.is_success());
    }
}
