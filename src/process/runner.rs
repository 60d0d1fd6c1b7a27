//! Launching native processes with a combined output stream.
//!
//! [`ProcessRunner::launch`] spawns a child whose standard output and
//! standard error are both connected to the write end of one anonymous
//! pipe, so the caller reads a single byte stream in the order the child
//! wrote it. The returned [`ProcessHandle`] can request termination and
//! wait for the exit status.
//!
//! # Exit codes
//!
//! A child that exits normally reports its own status. A child killed by a
//! signal on Unix reports `128 + signal` (so a terminated child typically
//! reports `137`); when the platform provides no code at all `-1` is used.
//! Callers must not rely on a specific code after termination.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, PipeReader};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::error::{Result, TaskError};

/// Readable end of a child's combined stdout/stderr.
pub type OutputStream = PipeReader;

/// Program, arguments and environment for one child process.
///
/// # Examples
///
/// ```
/// use sketch_tasks::process::CommandLine;
///
/// let cmd = CommandLine::new("make")
///     .arg("--directory=/proj")
///     .arg("Release")
///     .env("CC", "clang");
/// assert_eq!(cmd.to_string(), "make --directory=/proj Release");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    /// Executable name or path.
    pub program: String,
    /// Arguments in order.
    pub args: Vec<String>,
    /// Working directory; the parent's when `None`.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables layered over the parent's environment.
    pub env: BTreeMap<String, String>,
}

impl CommandLine {
    /// Creates a command line for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Adds one environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Adds several environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A freshly spawned child: its handle plus the read end of its output.
///
/// The two halves are separate so a reader can block on `output` while
/// still being able to call [`ProcessHandle::request_termination`].
#[derive(Debug)]
pub struct LaunchedProcess {
    /// Lifecycle handle of the child.
    pub handle: ProcessHandle,
    /// Combined stdout/stderr of the child.
    pub output: OutputStream,
}

/// Spawns native processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a runner.
    pub fn new() -> Self {
        Self
    }

    /// Spawns `command` with stdout and stderr merged into one stream.
    ///
    /// Standard input is connected to the null device.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Spawn`] if the pipe cannot be created, the
    /// executable cannot be found, or the OS refuses to create the process.
    pub fn launch(&self, command: &CommandLine) -> Result<LaunchedProcess> {
        let spawn_error = |source: io::Error| TaskError::Spawn {
            command: command.program.clone(),
            source,
        };

        let (reader, writer) = io::pipe().map_err(spawn_error)?;
        let err_writer = writer.try_clone().map_err(spawn_error)?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(err_writer);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(spawn_error)?;
        // The Command still owns both write ends; the reader only sees
        // end-of-stream once every write end is closed.
        drop(cmd);

        tracing::debug!(
            pid = child.id(),
            command = %command,
            working_dir = ?command.working_dir,
            "Launched child process"
        );

        Ok(LaunchedProcess {
            handle: ProcessHandle::new(child),
            output: reader,
        })
    }
}

/// Handle to a running (or exited) child process.
///
/// Dropping a handle whose child has not been waited for kills and reaps
/// the child, so no zombie or orphan is left behind.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    status: Option<ExitStatus>,
    termination_requested: bool,
}

impl ProcessHandle {
    fn new(child: Child) -> Self {
        Self {
            child,
            status: None,
            termination_requested: false,
        }
    }

    /// OS process identifier.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Returns `true` once a termination signal has been sent.
    pub fn termination_requested(&self) -> bool {
        self.termination_requested
    }

    /// Sends a termination signal to the child.
    ///
    /// Idempotent: a second call, or a call after the child has already
    /// exited, does nothing and returns `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the signal could not be delivered.
    pub fn request_termination(&mut self) -> io::Result<()> {
        if self.status.is_some() || self.termination_requested {
            return Ok(());
        }

        if let Some(status) = self.child.try_wait()? {
            self.status = Some(status);
            return Ok(());
        }

        self.child.kill()?;
        self.termination_requested = true;
        tracing::debug!(pid = self.child.id(), "Termination requested");
        Ok(())
    }

    /// Blocks until the child exits and returns its exit code.
    ///
    /// Repeated calls return the cached code.
    ///
    /// # Errors
    ///
    /// Returns the OS error if waiting fails.
    pub fn wait(&mut self) -> io::Result<i32> {
        let status = match self.status {
            Some(status) => status,
            None => {
                let status = self.child.wait()?;
                self.status = Some(status);
                status
            },
        };
        Ok(exit_code_of(status))
    }
}

/// What a task's read loop needs from a launched child.
pub(crate) trait ChildControl {
    fn pid(&self) -> u32;
    fn request_termination(&mut self) -> io::Result<()>;
    fn wait(&mut self) -> io::Result<i32>;
}

impl ChildControl for ProcessHandle {
    fn pid(&self) -> u32 {
        self.id()
    }

    fn request_termination(&mut self) -> io::Result<()> {
        ProcessHandle::request_termination(self)
    }

    fn wait(&mut self) -> io::Result<i32> {
        ProcessHandle::wait(self)
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.status.is_none() {
            tracing::debug!(pid = self.child.id(), "Reaping unwaited child on drop");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
