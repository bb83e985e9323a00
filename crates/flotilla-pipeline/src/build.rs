//! Build coordinator: parallel unit builds with a fail-fast barrier.

use crate::context::RunContext;
use flotilla_core::{obs, BuildArtifact, FlotillaError, ImageBuilder, Result, Unit};
use futures::{stream, StreamExt};
use std::sync::Arc;
use tracing::{error, info};

/// Builds every unit in the build set in parallel.
///
/// Unit builds share no mutable state: each build's context is its own
/// directory and each result is an independent value. The stage blocks
/// until every dispatched build completes; if any failed, the stage
/// fails with that unit's identity and nothing is published afterwards.
/// Sibling artifacts from the same batch are not rolled back — the
/// reclaimer removes them from the local cache later.
pub struct BuildCoordinator {
    builder: Arc<dyn ImageBuilder>,
}

impl BuildCoordinator {
    pub fn new(builder: Arc<dyn ImageBuilder>) -> Self {
        Self { builder }
    }

    /// Build all selected units. Returns artifacts in unit order.
    pub async fn build_all(&self, units: &[Unit], ctx: &RunContext) -> Result<Vec<BuildArtifact>> {
        let results: Vec<Result<BuildArtifact>> = stream::iter(units.to_vec())
            .map(|unit| {
                let builder = Arc::clone(&self.builder);
                async move {
                    let image = ctx.image_ref(&unit.name);
                    let labels = ctx.labels_for(&unit.name);
                    info!(unit = %unit.name, image = %image, "building");

                    let image_id = builder.build(&unit, &image, &labels).await.map_err(|e| {
                        FlotillaError::BuildFailed {
                            unit: unit.name.clone(),
                            message: e.to_string(),
                        }
                    })?;

                    info!(unit = %unit.name, image_id = %image_id, "built");
                    Ok(BuildArtifact {
                        unit: unit.name.clone(),
                        image,
                        image_id,
                    })
                }
            })
            .buffer_unordered(ctx.jobs)
            .collect()
            .await;

        // All builds have finished; now apply the fail-fast criterion.
        // In-flight siblings of a failed build ran to completion above,
        // but their artifacts are discarded with the stage failure.
        let mut artifacts = Vec::with_capacity(results.len());
        let mut failure: Option<FlotillaError> = None;
        for result in results {
            match result {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => {
                    error!(error = %e, "unit build failed");
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(e) = failure {
            obs::emit_stage_finished("build", units.len(), false);
            return Err(e);
        }

        artifacts.sort_by(|a, b| a.unit.cmp(&b.unit));
        obs::emit_stage_finished("build", units.len(), true);
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::fakes::RecordingBuilder;
    use flotilla_core::{DeployTarget, Revision};
    use std::path::PathBuf;

    fn ctx() -> RunContext {
        RunContext::new(
            PathBuf::from("/repo"),
            Revision {
                commit: "a".repeat(40),
                short_commit: "aaaaaaa".to_string(),
                author: "dev".to_string(),
                message: "msg".to_string(),
                branch: "main".to_string(),
            },
            DeployTarget::Auto,
            "reg.example.com",
            "apps",
            4,
            false,
        )
    }

    fn units(names: &[&str]) -> Vec<Unit> {
        names
            .iter()
            .map(|n| Unit::new(*n, format!("/repo/{n}")))
            .collect()
    }

    #[tokio::test]
    async fn test_builds_every_unit_and_orders_artifacts() {
        let builder = Arc::new(RecordingBuilder::new());
        let ctx = ctx();

        let artifacts = BuildCoordinator::new(builder.clone())
            .build_all(&units(&["app2", "app1"]), &ctx)
            .await
            .unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].unit, "app1");
        assert_eq!(artifacts[1].unit, "app2");
        assert_eq!(artifacts[0].image.tag, "latest");
        assert_eq!(builder.built_units().len(), 2);
    }

    #[tokio::test]
    async fn test_single_failure_fails_the_stage() {
        let builder = Arc::new(RecordingBuilder::new());
        builder.fail_build_of("app2");
        let ctx = ctx();

        let err = BuildCoordinator::new(builder)
            .build_all(&units(&["app1", "app2", "app3"]), &ctx)
            .await
            .unwrap_err();

        match err {
            FlotillaError::BuildFailed { unit, .. } => assert_eq!(unit, "app2"),
            other => panic!("expected BuildFailed, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_siblings_of_a_failed_build_still_run() {
        let builder = Arc::new(RecordingBuilder::new());
        builder.fail_build_of("app1");
        let ctx = ctx();

        let result = BuildCoordinator::new(builder.clone())
            .build_all(&units(&["app1", "app2", "app3"]), &ctx)
            .await;

        assert!(result.is_err());
        // The batch barrier waits for every dispatched build.
        assert_eq!(builder.built_units().len(), 2);
    }
}
