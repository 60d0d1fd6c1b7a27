//! Subscription-based notification channel.
//!
//! [`NotificationChannel`] holds a list of subscribers and dispatches each
//! posted [`TaskNotification`] to all of them by value. Posting never
//! blocks, so it is safe to call from the blocking worker thread that
//! drives a process. Subscribers whose receiver has been dropped are
//! pruned on the next post.
//!
//! # Examples
//!
//! ```
//! use sketch_tasks::{NotificationChannel, ProgressLine, TaskNotification};
//!
//! let channel = NotificationChannel::new();
//! let mut rx = channel.subscribe();
//!
//! channel.post(TaskNotification::Line(ProgressLine::new("t1", "hello")));
//!
//! let received = rx.try_recv().unwrap();
//! assert_eq!(received.task_id(), "t1");
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::types::notification::TaskNotification;

/// Receiving end handed out by [`NotificationChannel::subscribe`].
pub type NotificationReceiver = mpsc::UnboundedReceiver<TaskNotification>;

/// Fan-out channel for task notifications.
///
/// `Clone` is cheap and yields a handle to the same subscriber list.
#[derive(Debug, Clone, Default)]
pub struct NotificationChannel {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<TaskNotification>>>>,
}

impl NotificationChannel {
    /// Creates a channel with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    ///
    /// The subscriber sees every notification posted after this call, in
    /// posting order.
    pub fn subscribe(&self) -> NotificationReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Delivers `notification` to every live subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn post(&self, notification: TaskNotification) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(notification.clone()).is_ok());
        let delivered = subscribers.len();
        drop(subscribers);

        if delivered == 0 {
            tracing::trace!(
                task_id = %notification.task_id(),
                "Notification posted with no subscribers"
            );
        }

        delivered
    }

    /// Number of subscribers still registered.
    ///
    /// Dropped receivers are only noticed on the next [`post`](Self::post).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
