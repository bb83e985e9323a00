//! Run driver: discover, decide, build, publish, reclaim, report.

use crate::build::BuildCoordinator;
use crate::context::RunContext;
use crate::decision::DecisionEngine;
use crate::publish::PublishCoordinator;
use crate::reclaim::Reclaimer;
use crate::report::{RunOutcome, RunReport, UnitReport};
use flotilla_core::{
    discover_units, obs, BuildDecision, DeployTarget, FlotillaError, ImageBuilder, ImageRef,
    ImageRegistry, PublishResult, RegistryAuth, Result, Unit, Vcs,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Caller-supplied knobs for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub repo_root: PathBuf,
    pub registry: String,
    pub namespace: String,
    pub target: DeployTarget,
    pub branch_override: Option<String>,
    pub jobs: usize,
    pub keep_images: bool,
    pub auth: Option<RegistryAuth>,
}

/// Orchestrates one full incremental run.
///
/// Stage order is fixed: discovery, revision resolution, per-unit
/// decisions, builds, publishes, reclamation, summary. The build set is
/// computed once from the decisions and never grows or shrinks after
/// that. Reclamation runs on every exit path, including stage failures.
pub struct BuildPipeline {
    vcs: Arc<dyn Vcs>,
    registry: Arc<dyn ImageRegistry>,
    builder: Arc<dyn ImageBuilder>,
}

impl BuildPipeline {
    pub fn new(
        vcs: Arc<dyn Vcs>,
        registry: Arc<dyn ImageRegistry>,
        builder: Arc<dyn ImageBuilder>,
    ) -> Self {
        Self {
            vcs,
            registry,
            builder,
        }
    }

    pub async fn run(&self, opts: RunOptions) -> Result<RunReport> {
        if opts.registry.trim().is_empty() {
            return Err(FlotillaError::InvalidConfig(
                "registry host must not be empty".to_string(),
            ));
        }
        if opts.namespace.trim().is_empty() {
            return Err(FlotillaError::InvalidConfig(
                "registry namespace must not be empty".to_string(),
            ));
        }

        let units = discover_units(&opts.repo_root)?;
        let revision = self
            .vcs
            .head_revision(&opts.repo_root, opts.branch_override.as_deref())
            .await?;

        let ctx = RunContext::new(
            opts.repo_root.clone(),
            revision,
            opts.target,
            &opts.registry,
            &opts.namespace,
            opts.jobs,
            opts.keep_images,
        );

        let _span = obs::RunSpan::enter(&ctx.run_id);
        obs::emit_run_started(&ctx.run_id, &ctx.revision.branch, &ctx.revision.short_commit);

        let reclaimer = Reclaimer::new(Arc::clone(&self.registry), Arc::clone(&self.builder));

        if units.is_empty() {
            info!("no buildable units in repository");
            reclaimer.reclaim(ctx.keep_images, &[]).await;
            let report = self.report(&ctx, RunOutcome::NoUnits, &[], &[]);
            obs::emit_run_finished(&ctx.run_id, &report.outcome.to_string(), true);
            return Ok(report);
        }

        let engine = DecisionEngine::new(Arc::clone(&self.registry), Arc::clone(&self.vcs));
        let decisions = engine.decide_all(&units, &ctx).await;

        // The build set is fixed here; later stages only consume it.
        let build_set: Vec<Unit> = units
            .iter()
            .filter(|u| {
                decisions
                    .iter()
                    .any(|d| d.unit == u.name && d.needs_build)
            })
            .cloned()
            .collect();

        if build_set.is_empty() {
            info!("every published image is current");
            reclaimer.reclaim(ctx.keep_images, &[]).await;
            let report = self.report(&ctx, RunOutcome::NoChanges, &decisions, &[]);
            obs::emit_run_finished(&ctx.run_id, &report.outcome.to_string(), true);
            return Ok(report);
        }

        let run_images: Vec<ImageRef> =
            build_set.iter().map(|u| ctx.image_ref(&u.name)).collect();

        let outcome = self.build_and_publish(&build_set, &ctx, opts.auth.as_ref()).await;

        // Cleanup happens whether or not the stages succeeded.
        reclaimer.reclaim(ctx.keep_images, &run_images).await;

        match outcome {
            Ok(pushed) => {
                let report = self.report(&ctx, RunOutcome::Built, &decisions, &pushed);
                obs::emit_run_finished(&ctx.run_id, &report.outcome.to_string(), true);
                Ok(report)
            }
            Err(e) => {
                obs::emit_run_finished(&ctx.run_id, "failed", false);
                Err(e)
            }
        }
    }

    async fn build_and_publish(
        &self,
        build_set: &[Unit],
        ctx: &RunContext,
        auth: Option<&RegistryAuth>,
    ) -> Result<Vec<PublishResult>> {
        let artifacts = BuildCoordinator::new(Arc::clone(&self.builder))
            .build_all(build_set, ctx)
            .await?;

        PublishCoordinator::new(Arc::clone(&self.registry))
            .publish_all(&artifacts, ctx, auth)
            .await
    }

    fn report(
        &self,
        ctx: &RunContext,
        outcome: RunOutcome,
        decisions: &[BuildDecision],
        pushed: &[PublishResult],
    ) -> RunReport {
        let pushed_by_unit: HashMap<&str, &PublishResult> =
            pushed.iter().map(|p| (p.unit.as_str(), p)).collect();

        let units = decisions
            .iter()
            .map(|d| UnitReport {
                name: d.unit.clone(),
                needs_build: d.needs_build,
                reason: d.reason,
                pushed_image: pushed_by_unit
                    .get(d.unit.as_str())
                    .filter(|p| p.success)
                    .map(|_| ctx.image_ref(&d.unit).to_string()),
            })
            .collect();

        RunReport {
            run_id: ctx.run_id.clone(),
            branch: ctx.revision.branch.clone(),
            commit_short: ctx.revision.short_commit.clone(),
            author: ctx.revision.author.clone(),
            deploy_target: ctx.target.to_string(),
            registry: ctx.registry.clone(),
            namespace: ctx.namespace.clone(),
            outcome,
            units,
        }
    }
}
