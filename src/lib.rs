//! Process-backed background tasks for sketch build tooling.
//!
//! This crate runs external programs (typically `make`) on worker threads,
//! streams their combined stdout/stderr back as lines, and reports each
//! task's end through a subscription channel. Tasks can be cancelled
//! cooperatively from any thread.
//!
//! # Overview
//!
//! A task moves through a small state machine
//! (`created` -> `running` -> `completed`/`cancelled`/`failed`). While it
//! runs, every decoded output line becomes a [`ProgressLine`]
//! notification; when it leaves `running`, the [`TaskQueue`] posts one
//! [`TerminalEvent`].
//!
//! # Module Organization
//!
//! - [`process`] - Child launching, line decoding and [`ProcessTask`]
//! - [`build`] - [`BuildConfig`], argument computation and [`BuildTask`]
//! - [`queue`] - [`TaskQueue`] running tasks on the blocking pool
//! - [`channel`] - Fan-out [`NotificationChannel`]
//! - [`types`] - Task states and notification wire types
//! - [`error`] - [`TaskError`] and the crate [`Result`]
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use sketch_tasks::{BuildConfig, BuildTarget, BuildTask, TaskNotification, TaskQueue};
//!
//! # #[tokio::main]
//! # async fn main() -> sketch_tasks::Result<()> {
//! let config = BuildConfig::from_env()?;
//! let queue = TaskQueue::new();
//! let mut rx = queue.subscribe();
//!
//! queue.enqueue(BuildTask::new(&config, Path::new("apps/myApps/Hello"), BuildTarget::Release))?;
//!
//! while let Some(notification) = rx.recv().await {
//!     match notification {
//!         TaskNotification::Line(line) => println!("{}", line.text),
//!         TaskNotification::Terminal(event) => {
//!             println!("build {}", event.state);
//!             break;
//!         },
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod channel;
pub mod error;
pub mod process;
pub mod project;
pub mod queue;
pub mod task;
pub mod types;

/// Tracing subscriber setup.
#[cfg(feature = "logging")]
pub mod logging;

// Re-exports for ergonomic access
pub use build::{build_arguments, BuildConfig, BuildTarget, BuildTask};
pub use channel::{NotificationChannel, NotificationReceiver};
pub use error::{Result, TaskError};
pub use process::{ProcessTask, TaskOutcome};
pub use project::{Project, ProjectPath};
pub use queue::TaskQueue;
pub use task::Task;
pub use types::{ProgressLine, TaskFailure, TaskNotification, TaskState, TerminalEvent};
