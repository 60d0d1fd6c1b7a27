//! The process-backed task primitive.
//!
//! [`ProcessTask`] owns a command line and drives one child process through
//! `Created -> Running -> {Completed, Cancelled, Failed}`. Output is decoded
//! into lines and handed, in order, to a [`LineHandler`]. Cancellation is
//! cooperative: the flag is polled before every read and, once set, the
//! child is asked to terminate while the remaining output keeps flowing
//! until the stream closes.

use std::io::Read;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, TaskError};
use crate::process::decoder::LineDecoder;
use crate::process::runner::{ChildControl, CommandLine, LaunchedProcess, ProcessRunner};
use crate::types::notification::{TaskFailure, TerminalEvent};
use crate::types::state::TaskState;

/// Default number of bytes read from the child per read call.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Receives each decoded output line of a task.
///
/// Implemented for every `FnMut(&str)`, so a closure is usually enough.
///
/// # Examples
///
/// ```
/// use sketch_tasks::process::LineHandler;
///
/// let mut seen = Vec::new();
/// let mut handler = |line: &str| seen.push(line.to_string());
/// handler.on_line("hello");
/// assert_eq!(seen, vec!["hello"]);
/// ```
pub trait LineHandler {
    /// Called once per line, in output order. Blank lines are included.
    fn on_line(&mut self, line: &str);
}

impl<F> LineHandler for F
where
    F: FnMut(&str),
{
    fn on_line(&mut self, line: &str) {
        self(line);
    }
}

/// Result of running a task to a terminal state.
#[derive(Debug)]
pub struct TaskOutcome {
    /// Terminal state reached.
    pub state: TaskState,
    /// Exit code of the child; authoritative only for `Completed`.
    pub exit_code: Option<i32>,
    /// Error that caused `Failed`, or that accompanied `Cancelled`.
    pub error: Option<TaskError>,
    /// Number of lines handed to the line handler.
    pub lines: usize,
}

impl TaskOutcome {
    /// Builds the terminal event reported for `task_id`.
    pub fn to_terminal_event(&self, task_id: &str) -> TerminalEvent {
        TerminalEvent {
            task_id: task_id.to_string(),
            state: self.state,
            exit_code: self.exit_code,
            error: self.error.as_ref().map(TaskFailure::from),
        }
    }
}

/// A unit of work wrapping exactly one child-process invocation.
///
/// At most one thread runs a given task; other threads interact with it
/// only through its [`CancellationToken`].
///
/// # Examples
///
/// ```no_run
/// use sketch_tasks::process::ProcessTask;
/// use sketch_tasks::TaskState;
///
/// let mut task = ProcessTask::new("greet", "echo", ["hello"], 64);
/// let mut lines = Vec::new();
/// let outcome = task.run(&mut |line: &str| lines.push(line.to_string())).unwrap();
///
/// assert_eq!(lines, vec!["hello"]);
/// assert_eq!(outcome.state, TaskState::Completed);
/// assert_eq!(task.exit_code(), Some(0));
/// ```
#[derive(Debug)]
pub struct ProcessTask {
    id: String,
    command: CommandLine,
    buffer_size: usize,
    cancel: CancellationToken,
    state: TaskState,
    exit_code: Option<i32>,
    runner: ProcessRunner,
}

impl ProcessTask {
    /// Creates a task that runs `command` with `args`.
    ///
    /// `buffer_size` is the number of bytes requested per read; zero is
    /// treated as one.
    pub fn new<I, S>(
        id: impl Into<String>,
        command: impl Into<String>,
        args: I,
        buffer_size: usize,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_command_line(id, CommandLine::new(command).args(args), buffer_size)
    }

    /// Creates a task from a prepared [`CommandLine`].
    pub fn from_command_line(
        id: impl Into<String>,
        command: CommandLine,
        buffer_size: usize,
    ) -> Self {
        Self {
            id: id.into(),
            command,
            buffer_size: buffer_size.max(1),
            cancel: CancellationToken::new(),
            state: TaskState::Created,
            exit_code: None,
            runner: ProcessRunner::new(),
        }
    }

    /// Replaces the task identity.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Runs the child in `dir`.
    pub fn with_working_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.command = self.command.current_dir(dir);
        self
    }

    /// Adds environment variables for the child.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.command = self.command.envs(vars);
        self
    }

    /// Uses `token` as this task's cancellation flag.
    ///
    /// Handy for tying a task to a parent token via
    /// [`CancellationToken::child_token`].
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Identity of the task.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Executable to launch.
    pub fn command(&self) -> &str {
        &self.command.program
    }

    /// Arguments passed to the executable.
    pub fn args(&self) -> &[String] {
        &self.command.args
    }

    /// Full command line, including working directory and environment.
    pub fn command_line(&self) -> &CommandLine {
        &self.command
    }

    /// Bytes requested per read.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Exit code of the child.
    ///
    /// `None` until the task reaches a terminal state, and possibly `None`
    /// afterwards if no exit status was observed.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Asks the task to stop. Safe to call from any thread, any number of times.
    pub fn request_cancellation(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Handle to this task's cancellation flag.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Launches the child and feeds every output line to `handler`.
    ///
    /// Blocks the calling thread until the child's output stream closes and
    /// the child has been reaped.
    ///
    /// The cancellation flag is polled before each read. Once it is set the
    /// child is asked to terminate and reading continues until end of
    /// stream, so output already in flight is still delivered. A child that
    /// ignores termination and writes nothing keeps this call blocked until
    /// it exits; there is no built-in forced-kill timeout.
    ///
    /// Termination reaches the direct child only. Its own children (the
    /// compiler jobs of a parallel `make`) inherit the output stream and
    /// keep it open until they exit, so a cancelled build still ends only
    /// once they are done.
    ///
    /// Spawn failures and read failures do not produce `Err`: they are
    /// reported as a `Failed` (or `Cancelled`) outcome carrying the error.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidTransition`] if the task is not in
    /// [`TaskState::Created`].
    pub fn run<H>(&mut self, handler: &mut H) -> Result<TaskOutcome>
    where
        H: LineHandler + ?Sized,
    {
        self.transition(TaskState::Running)?;

        if self.cancel.is_cancelled() {
            tracing::debug!(task_id = %self.id, "Cancelled before launch");
            return self.finish(TaskState::Cancelled, None, None, 0);
        }

        let LaunchedProcess { mut handle, output } = match self.runner.launch(&self.command) {
            Ok(launched) => launched,
            Err(err) => {
                tracing::warn!(task_id = %self.id, error = %err, "Failed to launch task");
                return self.finish(TaskState::Failed, None, Some(err), 0);
            },
        };

        self.drive(output, &mut handle, handler)
    }

    /// Read loop and outcome mapping of a running task.
    fn drive<R, C, H>(&mut self, output: R, child: &mut C, handler: &mut H) -> Result<TaskOutcome>
    where
        R: Read,
        C: ChildControl + ?Sized,
        H: LineHandler + ?Sized,
    {
        let mut decoder = LineDecoder::new(output, self.buffer_size);
        let mut lines = 0usize;
        let mut termination_sent = false;
        let mut termination_error = None;
        let mut stream_error = None;

        loop {
            if !termination_sent && self.cancel.is_cancelled() {
                termination_sent = true;
                tracing::debug!(task_id = %self.id, pid = child.pid(), "Cancellation observed");
                if let Err(source) = child.request_termination() {
                    tracing::warn!(
                        task_id = %self.id,
                        error = %source,
                        "Termination request refused, reading until the stream closes"
                    );
                    termination_error = Some(TaskError::TerminationRequestFailed {
                        task_id: self.id.clone(),
                        source,
                    });
                }
            }

            match decoder.next_line() {
                Ok(Some(line)) => {
                    tracing::trace!(task_id = %self.id, line = %line, "Output line");
                    lines += 1;
                    handler.on_line(&line);
                },
                Ok(None) => break,
                Err(source) => {
                    tracing::warn!(task_id = %self.id, error = %source, "Output stream failed");
                    if let Some(rest) = decoder.take_partial() {
                        lines += 1;
                        handler.on_line(&rest);
                    }
                    stream_error = Some(TaskError::StreamRead { source });
                    break;
                },
            }
        }

        let cancelled = self.cancel.is_cancelled();
        drop(decoder);

        if stream_error.is_some() && !termination_sent {
            // Nobody reads the pipe any more; a live child could block wait() forever.
            if let Err(source) = child.request_termination() {
                tracing::warn!(task_id = %self.id, error = %source, "Termination after stream failure refused");
            }
        }

        let (exit_code, wait_error) = match child.wait() {
            Ok(code) => (Some(code), None),
            Err(source) => {
                tracing::warn!(task_id = %self.id, error = %source, "Failed to reap child");
                (
                    None,
                    Some(TaskError::Wait {
                        task_id: self.id.clone(),
                        source,
                    }),
                )
            },
        };

        let (state, error) = match (stream_error, cancelled, wait_error) {
            (Some(err), true, _) => (TaskState::Cancelled, Some(err)),
            (Some(err), false, _) => (TaskState::Failed, Some(err)),
            (None, true, wait_error) => (TaskState::Cancelled, termination_error.or(wait_error)),
            (None, false, Some(err)) => (TaskState::Failed, Some(err)),
            (None, false, None) => (TaskState::Completed, None),
        };

        self.finish(state, exit_code, error, lines)
    }

    fn transition(&mut self, next: TaskState) -> Result<()> {
        self.state.validate_transition(&self.id, &next)?;
        self.state = next;
        Ok(())
    }

    fn finish(
        &mut self,
        state: TaskState,
        exit_code: Option<i32>,
        error: Option<TaskError>,
        lines: usize,
    ) -> Result<TaskOutcome> {
        self.transition(state)?;
        self.exit_code = exit_code;

        tracing::debug!(
            task_id = %self.id,
            state = %state,
            exit_code = ?exit_code,
            lines = lines,
            "Task finished"
        );

        Ok(TaskOutcome {
            state,
            exit_code,
            error,
            lines,
        })
    }
}
