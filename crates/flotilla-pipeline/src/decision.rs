//! Change decision engine: does this unit need rebuilding?

use crate::context::RunContext;
use flotilla_core::{
    obs, BuildDecision, DecisionReason, ImageRef, ImageRegistry, Unit, Vcs, LABEL_COMMIT,
};
use futures::{stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Decides, per unit, whether the published image is current.
///
/// Each decision is independent and side-effect-free apart from
/// releasing the locally pulled copy of the inspected image. Every
/// undecidable state (registry unreachable, label unreadable, diff
/// failure) resolves toward rebuilding; false positives are the safe
/// fallback, false negatives are forbidden.
#[derive(Clone)]
pub struct DecisionEngine {
    registry: Arc<dyn ImageRegistry>,
    vcs: Arc<dyn Vcs>,
}

impl DecisionEngine {
    pub fn new(registry: Arc<dyn ImageRegistry>, vcs: Arc<dyn Vcs>) -> Self {
        Self { registry, vcs }
    }

    /// Evaluate one unit against the current revision.
    pub async fn decide(&self, unit: &Unit, ctx: &RunContext) -> BuildDecision {
        let image = ctx.image_ref(&unit.name);

        if let Err(e) = self.registry.pull(&image).await {
            debug!(unit = %unit.name, image = %image, error = %e, "no existing image");
            let decision = BuildDecision::rebuild(&unit.name, DecisionReason::NoExistingImage);
            obs::emit_decision(&unit.name, decision.needs_build, &decision.reason.to_string());
            return decision;
        }

        let decision = self.inspect(unit, ctx, &image).await;

        // Release the pulled copy right away; across many units the
        // local cache would otherwise grow without bound.
        if let Err(e) = self.registry.remove_local(&image).await {
            warn!(unit = %unit.name, image = %image, error = %e, "failed to release pulled image");
        }

        obs::emit_decision(&unit.name, decision.needs_build, &decision.reason.to_string());
        decision
    }

    async fn inspect(&self, unit: &Unit, ctx: &RunContext, image: &ImageRef) -> BuildDecision {
        let label = match self.registry.image_label(image, LABEL_COMMIT).await {
            Ok(Some(value)) if !value.trim().is_empty() => value,
            Ok(_) => {
                return BuildDecision::rebuild(&unit.name, DecisionReason::NoCommitLabel);
            }
            Err(e) => {
                debug!(unit = %unit.name, error = %e, "commit label unreadable");
                return BuildDecision::rebuild(&unit.name, DecisionReason::NoCommitLabel);
            }
        };

        // Equality always uses the full commit identifier; display
        // truncation happens elsewhere and never here.
        if label == ctx.revision.commit {
            return BuildDecision::skip(&unit.name, DecisionReason::SameCommit);
        }

        match self
            .vcs
            .changed_paths(&ctx.repo_root, &label, &ctx.revision.commit, unit.rel_path())
            .await
        {
            Ok(paths) if paths.is_empty() => {
                BuildDecision::skip(&unit.name, DecisionReason::PathUnchanged)
            }
            Ok(paths) => {
                debug!(unit = %unit.name, changed = paths.len(), "subtree changed");
                BuildDecision::rebuild(&unit.name, DecisionReason::PathChanged)
            }
            Err(e) => {
                warn!(unit = %unit.name, error = %e, "scoped diff failed, rebuilding");
                BuildDecision::rebuild(&unit.name, DecisionReason::DecisionError)
            }
        }
    }

    /// Evaluate all units through a bounded worker pool.
    ///
    /// Unit evaluations are isolated (each one only touches its own
    /// local-cache entry) so they run concurrently; results come back
    /// in unit order. A decision failure for one unit never aborts the
    /// others — `decide` is infallible by construction.
    pub async fn decide_all(&self, units: &[Unit], ctx: &RunContext) -> Vec<BuildDecision> {
        let mut decisions: Vec<BuildDecision> = stream::iter(units.to_vec())
            .map(|unit| {
                let engine = self.clone();
                async move { engine.decide(&unit, ctx).await }
            })
            .buffer_unordered(ctx.jobs)
            .collect()
            .await;

        decisions.sort_by(|a, b| a.unit.cmp(&b.unit));
        decisions
    }
}
