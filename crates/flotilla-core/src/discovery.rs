//! Unit discovery: find buildable app directories in the repository.

use crate::domain::unit::{Unit, BUILD_DESCRIPTOR};
use crate::domain::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Scan the repository root for buildable units.
///
/// A unit is a directory at exactly one level of nesting that contains a
/// build descriptor (`Dockerfile`). Deeper or shallower matches are
/// ignored: the repository follows a flat app-per-directory convention.
/// Hidden (dot-prefixed) directories are excluded. The result is
/// deduplicated by name and sorted for deterministic output.
///
/// Zero units is a normal result, not an error; the pipeline reports it
/// as a distinguished outcome.
pub fn discover_units(repo_root: &Path) -> Result<Vec<Unit>> {
    let mut found: BTreeMap<String, Unit> = BTreeMap::new();

    for entry in std::fs::read_dir(repo_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }

        let dir = entry.path();
        if !dir.join(BUILD_DESCRIPTOR).is_file() {
            debug!(unit = %name, "directory has no build descriptor, skipping");
            continue;
        }

        found.entry(name.clone()).or_insert_with(|| Unit::new(name, dir));
    }

    Ok(found.into_values().collect())
}
