//! End-to-end pipeline scenarios against in-memory collaborators.

use flotilla_core::fakes::{MemoryRegistry, RecordingBuilder, ScriptedVcs};
use flotilla_core::{DeployTarget, FlotillaError, ImageRef, RegistryAuth, LABEL_COMMIT};
use flotilla_pipeline::{BuildPipeline, RunOptions, RunOutcome};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const COMMIT: &str = "1234567890123456789012345678901234567890";
const OLD_COMMIT: &str = "9999999999999999999999999999999999999999";

fn repo_with_units(units: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for unit in units {
        let unit_dir = dir.path().join(unit);
        std::fs::create_dir(&unit_dir).unwrap();
        std::fs::write(unit_dir.join("Dockerfile"), "FROM python:3.11-slim\n").unwrap();
    }
    dir
}

fn options(repo_root: &Path) -> RunOptions {
    RunOptions {
        repo_root: repo_root.to_path_buf(),
        registry: "reg.example.com".to_string(),
        namespace: "apps".to_string(),
        target: DeployTarget::Auto,
        branch_override: None,
        jobs: 4,
        keep_images: false,
        auth: Some(RegistryAuth::new("ci-user", "ci-pass")),
    }
}

fn image_for(unit: &str) -> ImageRef {
    ImageRef::for_unit("reg.example.com", "apps", unit, DeployTarget::Auto, "main")
}

struct Harness {
    registry: Arc<MemoryRegistry>,
    vcs: Arc<ScriptedVcs>,
    builder: Arc<RecordingBuilder>,
}

impl Harness {
    fn new() -> Self {
        Self {
            registry: Arc::new(MemoryRegistry::new()),
            vcs: Arc::new(ScriptedVcs::on_main(COMMIT)),
            builder: Arc::new(RecordingBuilder::new()),
        }
    }

    fn pipeline(&self) -> BuildPipeline {
        BuildPipeline::new(
            self.vcs.clone(),
            self.registry.clone(),
            self.builder.clone(),
        )
    }
}

#[tokio::test]
async fn test_first_run_builds_and_publishes_everything() {
    let repo = repo_with_units(&["app1", "app2"]);
    let h = Harness::new();

    let report = h.pipeline().run(options(repo.path())).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Built);
    assert_eq!(report.branch, "main");
    assert_eq!(report.units.len(), 2);
    assert!(report.units.iter().all(|u| u.needs_build));
    assert_eq!(
        report.units[0].pushed_image.as_deref(),
        Some("reg.example.com/apps/app1:latest")
    );

    let mut pushed = h.registry.pushed_refs();
    pushed.sort();
    assert_eq!(
        pushed,
        vec![
            "reg.example.com/apps/app1:latest",
            "reg.example.com/apps/app2:latest",
        ]
    );
    assert_eq!(h.registry.calls().login, 1);
    assert_eq!(h.registry.calls().logout, 1);
    assert!(report.render_text().contains("docker pull reg.example.com/apps/app1:latest"));
}

#[tokio::test]
async fn test_empty_registry_is_rejected_before_any_work() {
    let repo = repo_with_units(&["app1"]);
    let h = Harness::new();
    let mut opts = options(repo.path());
    opts.registry = "  ".to_string();

    let err = h.pipeline().run(opts).await.unwrap_err();

    assert!(matches!(err, FlotillaError::InvalidConfig(_)));
    assert_eq!(h.registry.calls().total(), 0);
    assert!(h.builder.built_units().is_empty());
}

#[tokio::test]
async fn test_empty_repository_is_a_normal_no_units_run() {
    let repo = TempDir::new().unwrap();
    let h = Harness::new();

    let report = h.pipeline().run(options(repo.path())).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::NoUnits);
    assert!(report.units.is_empty());
    // Nothing to decide or publish, so the registry is never touched.
    assert_eq!(h.registry.calls().total(), 0);
    // Reclamation still runs on this path.
    assert_eq!(h.builder.prune_dangling_calls(), 1);
    assert_eq!(h.builder.prune_cache_calls(), 1);
}

#[tokio::test]
async fn test_current_images_mean_no_changes() {
    let repo = repo_with_units(&["app1", "app2"]);
    let h = Harness::new();
    h.registry
        .seed_image(&image_for("app1"), &[(LABEL_COMMIT, COMMIT)]);
    h.registry
        .seed_image(&image_for("app2"), &[(LABEL_COMMIT, COMMIT)]);

    let report = h.pipeline().run(options(repo.path())).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::NoChanges);
    assert!(report.units.iter().all(|u| !u.needs_build));
    assert!(h.builder.built_units().is_empty());
    assert_eq!(h.registry.calls().push, 0);
    assert_eq!(h.builder.prune_dangling_calls(), 1);
}

#[tokio::test]
async fn test_only_changed_units_are_rebuilt() {
    let repo = repo_with_units(&["app1", "app2"]);
    let h = Harness::new();
    h.vcs.set_changed("app2");
    h.registry
        .seed_image(&image_for("app1"), &[(LABEL_COMMIT, OLD_COMMIT)]);
    h.registry
        .seed_image(&image_for("app2"), &[(LABEL_COMMIT, OLD_COMMIT)]);

    let report = h.pipeline().run(options(repo.path())).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Built);
    assert_eq!(h.builder.built_units(), vec!["app2".to_string()]);
    assert_eq!(
        h.registry.pushed_refs(),
        vec!["reg.example.com/apps/app2:latest"]
    );
    assert!(report.units[0].pushed_image.is_none());
    assert!(report.units[1].pushed_image.is_some());
}

#[tokio::test]
async fn test_build_failure_publishes_nothing_but_still_reclaims() {
    let repo = repo_with_units(&["app1", "app2"]);
    let h = Harness::new();
    h.builder.fail_build_of("app1");

    let err = h.pipeline().run(options(repo.path())).await.unwrap_err();

    match err {
        FlotillaError::BuildFailed { unit, .. } => assert_eq!(unit, "app1"),
        other => panic!("expected BuildFailed, got {other}"),
    }
    assert_eq!(h.registry.calls().push, 0);
    assert_eq!(h.builder.prune_dangling_calls(), 1);
    assert_eq!(h.builder.prune_cache_calls(), 1);
}

#[tokio::test]
async fn test_push_failure_logs_out_and_reclaims() {
    let repo = repo_with_units(&["app1"]);
    let h = Harness::new();
    h.registry.fail_push_of(&image_for("app1"));

    let err = h.pipeline().run(options(repo.path())).await.unwrap_err();

    match err {
        FlotillaError::PushFailed { unit, .. } => assert_eq!(unit, "app1"),
        other => panic!("expected PushFailed, got {other}"),
    }
    assert_eq!(h.registry.calls().logout, 1);
    assert_eq!(h.builder.prune_dangling_calls(), 1);
}

#[tokio::test]
async fn test_reclamation_failures_never_change_the_outcome() {
    let repo = repo_with_units(&["app1"]);
    let h = Harness::new();
    h.builder.fail_prunes();
    h.registry.fail_remove_local();

    let report = h.pipeline().run(options(repo.path())).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Built);
    assert_eq!(
        h.registry.pushed_refs(),
        vec!["reg.example.com/apps/app1:latest"]
    );
}

#[tokio::test]
async fn test_branch_override_controls_the_published_tag() {
    let repo = repo_with_units(&["app1"]);
    let h = Harness::new();
    let mut opts = options(repo.path());
    opts.branch_override = Some("Feature/X_1".to_string());

    let report = h.pipeline().run(opts).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Built);
    assert_eq!(report.branch, "Feature/X_1");
    assert_eq!(
        h.registry.pushed_refs(),
        vec!["reg.example.com/apps/app1:feature-x_1"]
    );
}

#[tokio::test]
async fn test_keep_images_leaves_run_images_in_the_local_cache() {
    let repo = repo_with_units(&["app1"]);
    let h = Harness::new();
    let mut opts = options(repo.path());
    opts.keep_images = true;

    h.pipeline().run(opts).await.unwrap();

    // Decision-time release still happens, but the post-run removal of
    // this run's images is skipped.
    assert_eq!(h.registry.calls().remove_local, 0);
    assert_eq!(h.builder.prune_dangling_calls(), 1);
}
