//! Build tasks: a [`ProcessTask`] that runs the build tool.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::build::args::{build_arguments, normalize_directory};
use crate::build::config::BuildConfig;
use crate::build::target::BuildTarget;
use crate::channel::NotificationChannel;
use crate::error::Result;
use crate::process::task::{LineHandler, ProcessTask, TaskOutcome};
use crate::project::ProjectPath;
use crate::task::Task;
use crate::types::notification::{ProgressLine, TaskNotification};
use crate::types::state::TaskState;

/// Runs one make target of one project.
///
/// The argument vector is computed once, at construction, from the
/// configuration, the project directory and the target. Output lines are
/// posted as [`ProgressLine`] notifications; blank lines are dropped.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sketch_tasks::{BuildConfig, BuildTarget, BuildTask};
///
/// let config = BuildConfig::default()
///     .with_processor_count(4)
///     .with_cxx("g++");
/// let task = BuildTask::new(&config, Path::new("/proj"), BuildTarget::Release);
///
/// assert_eq!(task.id(), "/proj:Release");
/// assert_eq!(task.args(), ["--directory=/proj", "-j4", "-s", "CXX=g++", "Release"]);
/// ```
#[derive(Debug)]
pub struct BuildTask {
    target: BuildTarget,
    directory: PathBuf,
    process: ProcessTask,
}

impl BuildTask {
    /// Creates a task that builds `target` for `project` with `config`.
    ///
    /// The build tool inherits this process's working directory and
    /// changes into the project itself through `--directory`, so a relative
    /// project path is resolved once, against the caller's directory.
    /// `config.env` is added to its environment.
    pub fn new(
        config: &BuildConfig,
        project: impl ProjectPath,
        target: impl Into<BuildTarget>,
    ) -> Self {
        let target = target.into();
        let directory = project.project_path().to_path_buf();
        let args = build_arguments(config, &directory, target.as_str());
        let id = format!("{}:{}", normalize_directory(&directory), target);

        tracing::debug!(task_id = %id, command = %config.make_command, "Created build task");

        let process = ProcessTask::new(id, config.make_command.as_str(), args, config.buffer_size)
            .with_env(config.env.clone());

        Self {
            target,
            directory,
            process,
        }
    }

    /// Replaces the default `"<dir>:<target>"` identity.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.process = self.process.with_id(id);
        self
    }

    /// Uses `token` as the cancellation flag.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.process = self.process.with_cancellation_token(token);
        self
    }

    /// Identity of the task.
    pub fn id(&self) -> &str {
        self.process.id()
    }

    /// Make target being built.
    pub fn target(&self) -> &BuildTarget {
        &self.target
    }

    /// Project directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Arguments passed to the build tool.
    pub fn args(&self) -> &[String] {
        self.process.args()
    }

    /// The underlying process task.
    pub fn process(&self) -> &ProcessTask {
        &self.process
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.process.state()
    }

    /// Exit code of the build tool, once the task has finished.
    pub fn exit_code(&self) -> Option<i32> {
        self.process.exit_code()
    }

    /// Asks the build to stop.
    pub fn request_cancellation(&self) {
        self.process.request_cancellation();
    }

    /// Runs the build, posting each non-empty output line to `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidTransition`](crate::TaskError::InvalidTransition)
    /// if the task was already run.
    pub fn run(&mut self, channel: &NotificationChannel) -> Result<TaskOutcome> {
        let mut sink = ProgressSink {
            task_id: self.process.id().to_string(),
            channel,
        };
        self.process.run(&mut sink)
    }
}

/// Posts non-empty lines of one task.
struct ProgressSink<'a> {
    task_id: String,
    channel: &'a NotificationChannel,
}

impl LineHandler for ProgressSink<'_> {
    fn on_line(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        self.channel.post(TaskNotification::Line(ProgressLine::new(
            self.task_id.as_str(),
            line,
        )));
    }
}

impl Task for BuildTask {
    fn id(&self) -> &str {
        BuildTask::id(self)
    }

    fn state(&self) -> TaskState {
        BuildTask::state(self)
    }

    fn cancellation_token(&self) -> CancellationToken {
        self.process.cancellation_token()
    }

    fn execute(&mut self, channel: &NotificationChannel) -> Result<TaskOutcome> {
        self.run(channel)
    }
}
