//! Task queue: runs tasks on blocking worker threads and reports their end.
//!
//! [`TaskQueue`] is the scheduling side of a [`Task`]. It hands each
//! enqueued task to the tokio blocking pool, keeps the cancellation token
//! of every running task keyed by task identity, and posts exactly one
//! [`TaskNotification::Terminal`] per task when it leaves `Running`.
//!
//! # Examples
//!
//! ```no_run
//! use sketch_tasks::{ProcessTask, TaskNotification, TaskQueue};
//!
//! # #[tokio::main]
//! # async fn main() -> sketch_tasks::Result<()> {
//! let queue = TaskQueue::new();
//! let mut rx = queue.subscribe();
//!
//! let handle = queue.enqueue(ProcessTask::new("greet", "echo", ["hello"], 64))?;
//!
//! while let Some(notification) = rx.recv().await {
//!     match notification {
//!         TaskNotification::Line(line) => println!("{}", line.text),
//!         TaskNotification::Terminal(event) => {
//!             println!("{} finished: {}", event.task_id, event.state);
//!             break;
//!         },
//!     }
//! }
//! let event = handle.await.expect("worker panicked");
//! assert!(event.is_success());
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::channel::{NotificationChannel, NotificationReceiver};
use crate::error::{Result, TaskError};
use crate::task::Task;
use crate::types::notification::{TaskFailure, TaskNotification, TerminalEvent};
use crate::types::state::TaskState;

/// Runs tasks and fans their notifications out to subscribers.
///
/// `Clone` is cheap; clones share the running-task table and the channel.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

#[derive(Debug, Default)]
struct QueueInner {
    channel: NotificationChannel,
    active: DashMap<String, CancellationToken>,
}

/// Removes a task from the running table when dropped, including on panic.
struct ActiveEntry {
    inner: Arc<QueueInner>,
    task_id: String,
}

impl Drop for ActiveEntry {
    fn drop(&mut self) {
        self.inner.active.remove(&self.task_id);
    }
}

impl TaskQueue {
    /// Creates an empty queue with its own notification channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue that posts to an existing channel.
    pub fn with_channel(channel: NotificationChannel) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                channel,
                active: DashMap::new(),
            }),
        }
    }

    /// Starts `task` on the blocking pool.
    ///
    /// The returned handle resolves to the same [`TerminalEvent`] that is
    /// posted to the channel. A task that panics ends `Failed` with a
    /// `panicked` error.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidTransition`] if the task is not in `Created`
    /// - [`TaskError::DuplicateTask`] if a task with the same identity is running
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn enqueue<T: Task>(&self, mut task: T) -> Result<JoinHandle<TerminalEvent>> {
        let task_id = task.id().to_string();

        let state = task.state();
        if state != TaskState::Created {
            return Err(TaskError::InvalidTransition {
                task_id,
                from: state,
                to: TaskState::Running,
            });
        }

        match self.inner.active.entry(task_id.clone()) {
            Entry::Occupied(_) => return Err(TaskError::DuplicateTask { task_id }),
            Entry::Vacant(slot) => {
                slot.insert(task.cancellation_token());
            },
        }

        tracing::debug!(task_id = %task_id, "Task enqueued");

        let guard = ActiveEntry {
            inner: Arc::clone(&self.inner),
            task_id,
        };

        Ok(tokio::task::spawn_blocking(move || {
            let channel = guard.inner.channel.clone();
            let result = panic::catch_unwind(AssertUnwindSafe(|| task.execute(&channel)))
                .unwrap_or_else(|payload| {
                    Err(TaskError::Panicked {
                        task_id: guard.task_id.clone(),
                        message: panic_message(payload.as_ref()),
                    })
                });
            let event = match result {
                Ok(outcome) => outcome.to_terminal_event(&guard.task_id),
                Err(err) => {
                    tracing::error!(task_id = %guard.task_id, error = %err, "Task could not run");
                    TerminalEvent {
                        task_id: guard.task_id.clone(),
                        state: TaskState::Failed,
                        exit_code: None,
                        error: Some(TaskFailure::from(&err)),
                    }
                },
            };
            drop(guard);

            tracing::info!(
                task_id = %event.task_id,
                state = %event.state,
                exit_code = ?event.exit_code,
                "Task finished"
            );
            channel.post(TaskNotification::Terminal(event.clone()));
            event
        }))
    }

    /// Requests cancellation of the running task `task_id`.
    ///
    /// Calling this more than once has the same effect as calling it once.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if no such task is running.
    pub fn cancel(&self, task_id: &str) -> Result<()> {
        let token = self
            .inner
            .active
            .get(task_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TaskError::NotFound {
                task_id: task_id.to_string(),
            })?;

        tracing::debug!(task_id = %task_id, "Cancellation requested");
        token.cancel();
        Ok(())
    }

    /// Requests cancellation of every running task; returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let mut count = 0;
        for entry in self.inner.active.iter() {
            entry.value().cancel();
            count += 1;
        }
        count
    }

    /// Identities of the running tasks, sorted.
    pub fn active_tasks(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .active
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Returns `true` while `task_id` is running.
    pub fn is_active(&self, task_id: &str) -> bool {
        self.inner.active.contains_key(task_id)
    }

    /// Subscribes to line and terminal notifications of all tasks.
    pub fn subscribe(&self) -> NotificationReceiver {
        self.inner.channel.subscribe()
    }

    /// The channel notifications are posted to.
    pub fn channel(&self) -> &NotificationChannel {
        &self.inner.channel
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
