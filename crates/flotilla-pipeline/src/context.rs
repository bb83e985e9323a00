//! Immutable per-run context shared by every stage.

use chrono::{DateTime, Utc};
use flotilla_core::{DeployTarget, ImageLabels, ImageRef, Revision};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Everything a stage needs to know about the run in progress.
///
/// Built once after revision resolution and passed by reference to each
/// component; there is no mutable cross-stage environment. The same
/// context value drives tag derivation in every stage, so the decision,
/// build, push, and reclaim phases can never disagree about an image
/// reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunContext {
    /// Unique id of this run, embedded in image labels.
    pub run_id: String,

    /// Repository root being orchestrated.
    pub repo_root: PathBuf,

    /// Resolved source identity.
    pub revision: Revision,

    /// Deployment target controlling tag derivation.
    pub target: DeployTarget,

    /// Registry host.
    pub registry: String,

    /// Repository namespace within the registry.
    pub namespace: String,

    /// Worker-pool width for parallel stages.
    pub jobs: usize,

    /// When set, the reclaimer leaves this run's images in the local cache.
    pub keep_images: bool,

    /// Wall-clock start of the run; stamped into every label set.
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo_root: PathBuf,
        revision: Revision,
        target: DeployTarget,
        registry: impl Into<String>,
        namespace: impl Into<String>,
        jobs: usize,
        keep_images: bool,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            repo_root,
            revision,
            target,
            registry: registry.into(),
            namespace: namespace.into(),
            jobs: jobs.max(1),
            keep_images,
            started_at: Utc::now(),
        }
    }

    /// The tag every image in this run resolves to.
    pub fn tag(&self) -> String {
        self.target.derive_tag(&self.revision.branch)
    }

    /// Image reference for one unit under the shared tag-derivation rule.
    pub fn image_ref(&self, unit_name: &str) -> ImageRef {
        ImageRef::for_unit(
            &self.registry,
            &self.namespace,
            unit_name,
            self.target,
            &self.revision.branch,
        )
    }

    /// Traceability labels for one unit's build.
    pub fn labels_for(&self, unit_name: &str) -> ImageLabels {
        ImageLabels {
            commit: self.revision.commit.clone(),
            branch: self.revision.branch.clone(),
            author: self.revision.author.clone(),
            run_id: self.run_id.clone(),
            timestamp: self.started_at.to_rfc3339(),
            description: format!(
                "{} built from {} ({})",
                unit_name, self.revision.short_commit, self.revision.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revision(branch: &str) -> Revision {
        Revision {
            commit: "c".repeat(40),
            short_commit: "ccccccc".to_string(),
            author: "dev".to_string(),
            message: "msg".to_string(),
            branch: branch.to_string(),
        }
    }

    fn ctx(branch: &str, target: DeployTarget) -> RunContext {
        RunContext::new(
            PathBuf::from("/repo"),
            revision(branch),
            target,
            "reg.example.com",
            "apps",
            4,
            false,
        )
    }

    #[test]
    fn test_every_stage_sees_the_same_image_ref() {
        let ctx = ctx("Feature/X_1", DeployTarget::Auto);
        let image = ctx.image_ref("app1");
        assert_eq!(image.tag, "feature-x_1");
        assert_eq!(image.tag, ctx.tag());
        assert_eq!(image.to_string(), "reg.example.com/apps/app1:feature-x_1");
    }

    #[test]
    fn test_labels_carry_full_commit_and_run_id() {
        let ctx = ctx("main", DeployTarget::Auto);
        let labels = ctx.labels_for("app2");
        assert_eq!(labels.commit.len(), 40);
        assert_eq!(labels.run_id, ctx.run_id);
        assert!(labels.description.contains("app2"));
    }

    #[test]
    fn test_jobs_floor_is_one() {
        let ctx = RunContext::new(
            PathBuf::from("/repo"),
            revision("main"),
            DeployTarget::Auto,
            "r",
            "n",
            0,
            false,
        );
        assert_eq!(ctx.jobs, 1);
    }
}
