//! Process execution: launching, line decoding and the process-backed task.
//!
//! - [`runner`] spawns children with a merged stdout/stderr stream
//! - [`decoder`] splits that stream into lines
//! - [`task`] ties both together into [`ProcessTask`]

pub mod decoder;
pub mod runner;
pub mod task;

pub use decoder::LineDecoder;
pub use runner::{CommandLine, LaunchedProcess, OutputStream, ProcessHandle, ProcessRunner};
pub use task::{LineHandler, ProcessTask, TaskOutcome, DEFAULT_BUFFER_SIZE};
