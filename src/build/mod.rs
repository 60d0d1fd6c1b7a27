//! Build tool integration.
//!
//! [`BuildTask`] runs one make target of a project. Its argument vector
//! comes from a [`BuildConfig`] via [`build_arguments`].

pub mod args;
pub mod config;
pub mod target;
pub mod task;

pub use args::build_arguments;
pub use config::{BuildConfig, DEFAULT_MAKE_COMMAND, DEFAULT_TOOLCHAIN_ROOT_VAR};
pub use target::BuildTarget;
pub use task::BuildTask;
