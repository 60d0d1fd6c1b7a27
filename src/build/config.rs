//! Build tool configuration.
//!
//! [`BuildConfig`] holds everything that shapes a `make` invocation:
//! toolchain location, parallelism, verbosity, compiler overrides and
//! extra environment. It loads from TOML (missing keys fall back to
//! defaults) and can be overlaid with `SKETCH_*` environment variables.
//!
//! ```toml
//! toolchain_root = "/opt/openFrameworks"
//! processor_count = 8
//! silent = false
//! cxx = "clang++"
//!
//! [env]
//! PKG_CONFIG_PATH = "/opt/lib/pkgconfig"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};
use crate::process::task::DEFAULT_BUFFER_SIZE;

/// Default build tool executable.
pub const DEFAULT_MAKE_COMMAND: &str = "make";

/// Default make variable naming the toolchain root.
pub const DEFAULT_TOOLCHAIN_ROOT_VAR: &str = "OF_ROOT";

/// Configuration of a build task.
///
/// # Examples
///
/// ```
/// use sketch_tasks::BuildConfig;
///
/// let config = BuildConfig::from_toml_str("processor_count = 4\ncxx = \"g++\"").unwrap();
/// assert_eq!(config.processor_count, 4);
/// assert_eq!(config.cxx, "g++");
/// assert!(config.silent);
/// assert_eq!(config.make_command, "make");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build tool executable.
    pub make_command: String,
    /// Toolchain root path; empty means the makefile's default.
    pub toolchain_root: String,
    /// Make variable that receives `toolchain_root`.
    pub toolchain_root_var: String,
    /// Parallel jobs; `-jN` is only passed when greater than one.
    pub processor_count: usize,
    /// Pass `-s` to silence recipe echoing.
    pub silent: bool,
    /// C compiler override; empty means unset.
    pub cc: String,
    /// C++ compiler/linker override; empty means unset.
    pub cxx: String,
    /// Platform variant tag; empty means unset.
    pub platform_variant: String,
    /// Enable makefile debug tracing.
    pub debug: bool,
    /// Bytes requested per read of the build output.
    pub buffer_size: usize,
    /// Extra environment variables for the build tool.
    pub env: BTreeMap<String, String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            make_command: DEFAULT_MAKE_COMMAND.to_string(),
            toolchain_root: String::new(),
            toolchain_root_var: DEFAULT_TOOLCHAIN_ROOT_VAR.to_string(),
            processor_count: host_processor_count(),
            silent: true,
            cc: String::new(),
            cxx: String::new(),
            platform_variant: String::new(),
            debug: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            env: BTreeMap::new(),
        }
    }
}

/// Number of logical cores, or 1 if it cannot be determined.
pub fn host_processor_count() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

impl BuildConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] on malformed TOML or invalid values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| TaskError::config(format!("failed to parse build config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TaskError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded build config");
        Ok(config)
    }

    /// Serializes to a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TaskError::config(format!("failed to serialize build config: {e}")))
    }

    /// Defaults overlaid with the `SKETCH_*` variables of this process.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if a variable holds an invalid value.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlays values found through `lookup`.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `SKETCH_MAKE` | `make_command` |
    /// | `SKETCH_TOOLCHAIN_ROOT` | `toolchain_root` |
    /// | `SKETCH_BUILD_JOBS` | `processor_count` |
    /// | `SKETCH_BUILD_SILENT` | `silent` |
    /// | `SKETCH_CC` | `cc` |
    /// | `SKETCH_CXX` | `cxx` |
    /// | `SKETCH_PLATFORM_VARIANT` | `platform_variant` |
    /// | `SKETCH_MAKEFILE_DEBUG` | `debug` |
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if a value cannot be parsed or the
    /// result fails [`validate`](Self::validate).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SKETCH_MAKE") {
            self.make_command = value;
        }
        if let Some(value) = lookup("SKETCH_TOOLCHAIN_ROOT") {
            self.toolchain_root = value;
        }
        if let Some(value) = lookup("SKETCH_BUILD_JOBS") {
            self.processor_count = value.trim().parse().map_err(|_| {
                TaskError::config(format!("SKETCH_BUILD_JOBS is not a number: {value:?}"))
            })?;
        }
        if let Some(value) = lookup("SKETCH_BUILD_SILENT") {
            self.silent = parse_flag("SKETCH_BUILD_SILENT", &value)?;
        }
        if let Some(value) = lookup("SKETCH_CC") {
            self.cc = value;
        }
        if let Some(value) = lookup("SKETCH_CXX") {
            self.cxx = value;
        }
        if let Some(value) = lookup("SKETCH_PLATFORM_VARIANT") {
            self.platform_variant = value;
        }
        if let Some(value) = lookup("SKETCH_MAKEFILE_DEBUG") {
            self.debug = parse_flag("SKETCH_MAKEFILE_DEBUG", &value)?;
        }
        self.validate()
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] if `processor_count` or `buffer_size`
    /// is zero, or `make_command` is empty.
    pub fn validate(&self) -> Result<()> {
        if self.processor_count == 0 {
            return Err(TaskError::config("processor_count must be at least 1"));
        }
        if self.buffer_size == 0 {
            return Err(TaskError::config("buffer_size must be at least 1"));
        }
        if self.make_command.trim().is_empty() {
            return Err(TaskError::config("make_command must not be empty"));
        }
        Ok(())
    }

    /// Sets the build tool executable.
    pub fn with_make_command(mut self, command: impl Into<String>) -> Self {
        self.make_command = command.into();
        self
    }

    /// Sets the toolchain root path.
    pub fn with_toolchain_root(mut self, root: impl Into<String>) -> Self {
        self.toolchain_root = root.into();
        self
    }

    /// Sets the make variable that receives the toolchain root.
    pub fn with_toolchain_root_var(mut self, var: impl Into<String>) -> Self {
        self.toolchain_root_var = var.into();
        self
    }

    /// Sets the number of parallel jobs.
    pub fn with_processor_count(mut self, count: usize) -> Self {
        self.processor_count = count;
        self
    }

    /// Sets the silent flag.
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Sets the C compiler override.
    pub fn with_cc(mut self, cc: impl Into<String>) -> Self {
        self.cc = cc.into();
        self
    }

    /// Sets the C++ compiler/linker override.
    pub fn with_cxx(mut self, cxx: impl Into<String>) -> Self {
        self.cxx = cxx.into();
        self
    }

    /// Sets the platform variant tag.
    pub fn with_platform_variant(mut self, variant: impl Into<String>) -> Self {
        self.platform_variant = variant.into();
        self
    }

    /// Sets the makefile debug-tracing flag.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Adds an environment variable for the build tool.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the read size for build output.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(TaskError::config(format!(
            "{name} is not a boolean: {value:?}"
        ))),
    }
}
