//! Project references.
//!
//! A build task only needs the project's directory, so anything that can
//! hand out a path implements [`ProjectPath`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Something that lives in a directory on disk.
pub trait ProjectPath {
    /// Directory that holds the project's makefile.
    fn project_path(&self) -> &Path;
}

impl ProjectPath for Path {
    fn project_path(&self) -> &Path {
        self
    }
}

impl ProjectPath for PathBuf {
    fn project_path(&self) -> &Path {
        self.as_path()
    }
}

impl<T: ProjectPath + ?Sized> ProjectPath for &T {
    fn project_path(&self) -> &Path {
        (**self).project_path()
    }
}

/// A named sketch project.
///
/// # Examples
///
/// ```
/// use sketch_tasks::project::{Project, ProjectPath};
///
/// let project = Project::new("HelloWorld", "/sketches/HelloWorld");
/// assert_eq!(project.name(), "HelloWorld");
/// assert_eq!(project.project_path().to_str(), Some("/sketches/HelloWorld"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    name: String,
    path: PathBuf,
}

impl Project {
    /// Creates a project called `name` located at `path`.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Creates a project named after the last component of `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }

    /// Project name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ProjectPath for Project {
    fn project_path(&self) -> &Path {
        &self.path
    }
}
