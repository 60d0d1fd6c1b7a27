//! The contract between runnable tasks and the [`TaskQueue`](crate::TaskQueue).
//!
//! A [`Task`] exposes its identity, state and cancellation token to the
//! queue, and runs to a terminal state on a worker thread while posting
//! line notifications to a [`NotificationChannel`]. The terminal event
//! itself is posted by the queue, exactly once.

use tokio_util::sync::CancellationToken;

use crate::channel::NotificationChannel;
use crate::error::Result;
use crate::process::task::{ProcessTask, TaskOutcome};
use crate::types::notification::{ProgressLine, TaskNotification};
use crate::types::state::TaskState;

/// A unit of work the queue can run on a blocking worker thread.
pub trait Task: Send + 'static {
    /// Identity, unique among the queue's running tasks.
    fn id(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> TaskState;

    /// Handle to the task's cancellation flag.
    fn cancellation_token(&self) -> CancellationToken;

    /// Runs the task to a terminal state, posting line notifications to `channel`.
    ///
    /// Blocks the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidTransition`](crate::TaskError::InvalidTransition)
    /// if the task was already run.
    fn execute(&mut self, channel: &NotificationChannel) -> Result<TaskOutcome>;
}

/// Every decoded line, blank ones included, becomes a [`ProgressLine`].
impl Task for ProcessTask {
    fn id(&self) -> &str {
        ProcessTask::id(self)
    }

    fn state(&self) -> TaskState {
        ProcessTask::state(self)
    }

    fn cancellation_token(&self) -> CancellationToken {
        ProcessTask::cancellation_token(self)
    }

    fn execute(&mut self, channel: &NotificationChannel) -> Result<TaskOutcome> {
        let id = self.id().to_string();
        self.run(&mut |line: &str| {
            channel.post(TaskNotification::Line(ProgressLine::new(id.as_str(), line)));
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn process_task_posts_every_line() {
        let channel = NotificationChannel::new();
        let mut rx = channel.subscribe();

        let mut task = ProcessTask::new("lines", "printf", ["a\\n\\nb\\n"], 16);
        let outcome = Task::execute(&mut task, &channel).unwrap();
        assert_eq!(outcome.state, TaskState::Completed);

        let texts: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|n| match n {
                TaskNotification::Line(line) => line.text,
                TaskNotification::Terminal(_) => panic!("tasks never post terminal events"),
            })
            .collect();
        assert_eq!(texts, vec!["a", "", "b"]);
    }
}
