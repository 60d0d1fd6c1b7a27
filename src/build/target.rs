//! Well-known make targets of an openFrameworks-style project.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A make target.
///
/// The named variants cover the compile and run workflow of a sketch;
/// anything else goes through [`BuildTarget::Custom`].
///
/// # Examples
///
/// ```
/// use sketch_tasks::BuildTarget;
///
/// assert_eq!(BuildTarget::RunRelease.as_str(), "RunRelease");
/// assert_eq!(BuildTarget::from("Release"), BuildTarget::Release);
/// assert_eq!(BuildTarget::from("install").as_str(), "install");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildTarget {
    /// Optimized build.
    Release,
    /// Debug build.
    Debug,
    /// Build and launch the release binary.
    RunRelease,
    /// Build and launch the debug binary.
    RunDebug,
    /// Remove build products.
    Clean,
    /// Any other target name.
    Custom(String),
}

impl BuildTarget {
    /// Target name as passed to make.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Release => "Release",
            Self::Debug => "Debug",
            Self::RunRelease => "RunRelease",
            Self::RunDebug => "RunDebug",
            Self::Clean => "clean",
            Self::Custom(name) => name,
        }
    }

    /// Returns `true` for targets that launch the built program.
    pub fn runs_program(&self) -> bool {
        matches!(self, Self::RunRelease | Self::RunDebug)
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for BuildTarget {
    fn from(name: &str) -> Self {
        match name {
            "Release" => Self::Release,
            "Debug" => Self::Debug,
            "RunRelease" => Self::RunRelease,
            "RunDebug" => Self::RunDebug,
            "clean" => Self::Clean,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for BuildTarget {
    fn from(name: String) -> Self {
        match Self::from(name.as_str()) {
            Self::Custom(_) => Self::Custom(name),
            known => known,
        }
    }
}

impl From<BuildTarget> for String {
    fn from(target: BuildTarget) -> Self {
        match target {
            BuildTarget::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}
