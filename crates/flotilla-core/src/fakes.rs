//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `MemoryRegistry`, `ScriptedVcs`, and `RecordingBuilder` that
//! satisfy the trait contracts without git or docker installed. Every
//! fake records call counts so tests can assert properties like "zero
//! registry calls on the no-units path".

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::builder::ImageBuilder;
use crate::domain::error::{FlotillaError, Result};
use crate::domain::image::{ImageLabels, ImageRef};
use crate::domain::revision::Revision;
use crate::domain::unit::Unit;
use crate::git::Vcs;
use crate::registry::{ImageRegistry, RegistryAuth};

// ---------------------------------------------------------------------------
// MemoryRegistry
// ---------------------------------------------------------------------------

/// Per-method call counters for `MemoryRegistry`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCalls {
    pub login: usize,
    pub logout: usize,
    pub pull: usize,
    pub image_label: usize,
    pub push: usize,
    pub remove_local: usize,
}

impl RegistryCalls {
    /// Total number of registry operations observed.
    pub fn total(&self) -> usize {
        self.login + self.logout + self.pull + self.image_label + self.push + self.remove_local
    }
}

/// In-memory artifact registry backed by a map of reference → labels.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    images: Mutex<HashMap<String, HashMap<String, String>>>,
    local: Mutex<HashSet<String>>,
    pushed: Mutex<Vec<String>>,
    fail_pull: Mutex<HashSet<String>>,
    fail_push: Mutex<HashSet<String>>,
    fail_remove_local: Mutex<bool>,
    calls: Mutex<RegistryCalls>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an already-published image with the given labels.
    pub fn seed_image(&self, image: &ImageRef, labels: &[(&str, &str)]) {
        let mut images = self.images.lock().unwrap();
        images.insert(
            image.to_string(),
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
    }

    /// Make subsequent pulls of this reference fail.
    pub fn fail_pull_of(&self, image: &ImageRef) {
        self.fail_pull.lock().unwrap().insert(image.to_string());
    }

    /// Make subsequent pushes of this reference fail.
    pub fn fail_push_of(&self, image: &ImageRef) {
        self.fail_push.lock().unwrap().insert(image.to_string());
    }

    /// Make every `remove_local` call fail.
    pub fn fail_remove_local(&self) {
        *self.fail_remove_local.lock().unwrap() = true;
    }

    /// Snapshot of the call counters.
    pub fn calls(&self) -> RegistryCalls {
        self.calls.lock().unwrap().clone()
    }

    /// References pushed so far, in completion order.
    pub fn pushed_refs(&self) -> Vec<String> {
        self.pushed.lock().unwrap().clone()
    }

    /// Whether the local cache currently holds this reference.
    pub fn is_local(&self, image: &ImageRef) -> bool {
        self.local.lock().unwrap().contains(&image.to_string())
    }
}

#[async_trait]
impl ImageRegistry for MemoryRegistry {
    async fn login(&self, _registry: &str, _auth: &RegistryAuth) -> Result<()> {
        self.calls.lock().unwrap().login += 1;
        Ok(())
    }

    async fn logout(&self, _registry: &str) -> Result<()> {
        self.calls.lock().unwrap().logout += 1;
        Ok(())
    }

    async fn pull(&self, image: &ImageRef) -> Result<()> {
        self.calls.lock().unwrap().pull += 1;
        let reference = image.to_string();
        if self.fail_pull.lock().unwrap().contains(&reference) {
            return Err(FlotillaError::Registry(format!(
                "pull failed for {reference}"
            )));
        }
        if !self.images.lock().unwrap().contains_key(&reference) {
            return Err(FlotillaError::Registry(format!(
                "manifest unknown: {reference}"
            )));
        }
        self.local.lock().unwrap().insert(reference);
        Ok(())
    }

    async fn image_label(&self, image: &ImageRef, key: &str) -> Result<Option<String>> {
        self.calls.lock().unwrap().image_label += 1;
        let images = self.images.lock().unwrap();
        Ok(images
            .get(&image.to_string())
            .and_then(|labels| labels.get(key))
            .cloned())
    }

    async fn push(&self, image: &ImageRef) -> Result<()> {
        self.calls.lock().unwrap().push += 1;
        let reference = image.to_string();
        if self.fail_push.lock().unwrap().contains(&reference) {
            return Err(FlotillaError::Registry(format!(
                "push denied for {reference}"
            )));
        }
        self.pushed.lock().unwrap().push(reference.clone());
        self.images.lock().unwrap().entry(reference).or_default();
        Ok(())
    }

    async fn remove_local(&self, image: &ImageRef) -> Result<()> {
        self.calls.lock().unwrap().remove_local += 1;
        if *self.fail_remove_local.lock().unwrap() {
            return Err(FlotillaError::Registry("rmi failed".to_string()));
        }
        self.local.lock().unwrap().remove(&image.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedVcs
// ---------------------------------------------------------------------------

/// VCS fake returning a fixed revision and scripted per-scope diffs.
#[derive(Debug)]
pub struct ScriptedVcs {
    revision: Revision,
    changed_scopes: Mutex<HashSet<String>>,
    diff_error_scopes: Mutex<HashSet<String>>,
    diff_calls: Mutex<usize>,
}

impl ScriptedVcs {
    pub fn new(revision: Revision) -> Self {
        Self {
            revision,
            changed_scopes: Mutex::new(HashSet::new()),
            diff_error_scopes: Mutex::new(HashSet::new()),
            diff_calls: Mutex::new(0),
        }
    }

    /// Convenience revision on `main` with a fixed 40-char commit id.
    pub fn on_main(commit: &str) -> Self {
        Self::new(Revision {
            commit: commit.to_string(),
            short_commit: commit.chars().take(7).collect(),
            author: "test-author".to_string(),
            message: "test commit".to_string(),
            branch: "main".to_string(),
        })
    }

    /// Mark a unit subtree as changed between any two commits.
    pub fn set_changed(&self, scope: &str) {
        self.changed_scopes.lock().unwrap().insert(scope.to_string());
    }

    /// Make diff queries for a unit subtree fail.
    pub fn fail_diff_for(&self, scope: &str) {
        self.diff_error_scopes
            .lock()
            .unwrap()
            .insert(scope.to_string());
    }

    pub fn diff_calls(&self) -> usize {
        *self.diff_calls.lock().unwrap()
    }
}

#[async_trait]
impl Vcs for ScriptedVcs {
    async fn head_revision(
        &self,
        _repo: &Path,
        branch_override: Option<&str>,
    ) -> Result<Revision> {
        let mut revision = self.revision.clone();
        if let Some(branch) = branch_override {
            revision.branch = branch.to_string();
        }
        Ok(revision)
    }

    async fn changed_paths(
        &self,
        _repo: &Path,
        _from: &str,
        _to: &str,
        scope: &Path,
    ) -> Result<Vec<PathBuf>> {
        *self.diff_calls.lock().unwrap() += 1;
        let scope = scope.to_string_lossy().to_string();
        if self.diff_error_scopes.lock().unwrap().contains(&scope) {
            return Err(FlotillaError::Git(format!("diff failed for {scope}")));
        }
        if self.changed_scopes.lock().unwrap().contains(&scope) {
            Ok(vec![PathBuf::from(scope).join("main.py")])
        } else {
            Ok(Vec::new())
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingBuilder
// ---------------------------------------------------------------------------

/// Build-tool fake that records builds and prune calls.
#[derive(Debug, Default)]
pub struct RecordingBuilder {
    built: Mutex<Vec<String>>,
    fail_units: Mutex<HashSet<String>>,
    fail_prunes: Mutex<bool>,
    prune_dangling_calls: Mutex<usize>,
    prune_cache_calls: Mutex<usize>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make builds of this unit fail.
    pub fn fail_build_of(&self, unit: &str) {
        self.fail_units.lock().unwrap().insert(unit.to_string());
    }

    /// Make both prune operations fail.
    pub fn fail_prunes(&self) {
        *self.fail_prunes.lock().unwrap() = true;
    }

    /// Unit names built so far, in completion order.
    pub fn built_units(&self) -> Vec<String> {
        self.built.lock().unwrap().clone()
    }

    pub fn prune_dangling_calls(&self) -> usize {
        *self.prune_dangling_calls.lock().unwrap()
    }

    pub fn prune_cache_calls(&self) -> usize {
        *self.prune_cache_calls.lock().unwrap()
    }
}

#[async_trait]
impl ImageBuilder for RecordingBuilder {
    async fn build(&self, unit: &Unit, _image: &ImageRef, labels: &ImageLabels) -> Result<String> {
        if self.fail_units.lock().unwrap().contains(&unit.name) {
            return Err(FlotillaError::BuildTool(format!(
                "scripted build failure for {}",
                unit.name
            )));
        }
        self.built.lock().unwrap().push(unit.name.clone());
        Ok(format!("sha256:fake-{}-{}", unit.name, labels.run_id))
    }

    async fn prune_dangling(&self) -> Result<()> {
        *self.prune_dangling_calls.lock().unwrap() += 1;
        if *self.fail_prunes.lock().unwrap() {
            return Err(FlotillaError::BuildTool("prune failed".to_string()));
        }
        Ok(())
    }

    async fn prune_build_cache(&self, _older_than: Duration) -> Result<()> {
        *self.prune_cache_calls.lock().unwrap() += 1;
        if *self.fail_prunes.lock().unwrap() {
            return Err(FlotillaError::BuildTool("prune failed".to_string()));
        }
        Ok(())
    }
}
