//! Buildable application units discovered in the repository.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the build descriptor that qualifies a directory as a unit.
pub const BUILD_DESCRIPTOR: &str = "Dockerfile";

/// An independently buildable application directory.
///
/// Units are created at discovery time, are immutable for the run, and
/// are never persisted across runs. The name is the directory name;
/// because units live at exactly one level of nesting, the name is also
/// the unit's path relative to the repository root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unit {
    /// Unit name, derived from its directory.
    pub name: String,

    /// Absolute path to the unit directory (the build context).
    pub dir: PathBuf,

    /// Absolute path to the unit's build descriptor.
    pub dockerfile: PathBuf,
}

impl Unit {
    /// Construct a unit from its directory. The caller has already
    /// verified that the build descriptor exists.
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let dockerfile = dir.join(BUILD_DESCRIPTOR);
        Self {
            name: name.into(),
            dir,
            dockerfile,
        }
    }

    /// Path of the unit directory relative to the repository root.
    pub fn rel_path(&self) -> &Path {
        Path::new(&self.name)
    }
}
