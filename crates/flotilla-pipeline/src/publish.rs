//! Publish coordinator: login once, push in parallel, logout always.

use crate::context::RunContext;
use flotilla_core::{
    obs, BuildArtifact, FlotillaError, ImageRegistry, PublishResult, RegistryAuth, Result,
};
use futures::{stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Pushes built artifacts to the registry.
///
/// The registry session is a stage-wide resource: one login before the
/// batch, one logout after it, on the failure path too. Pushes run in
/// parallel with no ordering guarantee; any single failure fails the
/// stage (same policy as builds) because a partially published run is
/// worse than a delayed, fully successful retry.
pub struct PublishCoordinator {
    registry: Arc<dyn ImageRegistry>,
}

impl PublishCoordinator {
    pub fn new(registry: Arc<dyn ImageRegistry>) -> Self {
        Self { registry }
    }

    /// Push every artifact. Returns per-unit results in unit order.
    pub async fn publish_all(
        &self,
        artifacts: &[BuildArtifact],
        ctx: &RunContext,
        auth: Option<&RegistryAuth>,
    ) -> Result<Vec<PublishResult>> {
        match auth {
            Some(auth) => self.registry.login(&ctx.registry, auth).await?,
            None => debug!("no credentials configured, relying on ambient session"),
        }

        let outcome = self.push_batch(artifacts, ctx).await;

        // Session teardown happens regardless of how the batch went.
        if auth.is_some() {
            if let Err(e) = self.registry.logout(&ctx.registry).await {
                warn!(error = %e, "registry logout failed");
            }
        }

        obs::emit_stage_finished("publish", artifacts.len(), outcome.is_ok());
        outcome
    }

    async fn push_batch(
        &self,
        artifacts: &[BuildArtifact],
        ctx: &RunContext,
    ) -> Result<Vec<PublishResult>> {
        let results: Vec<Result<PublishResult>> = stream::iter(artifacts.to_vec())
            .map(|artifact| {
                let registry = Arc::clone(&self.registry);
                async move {
                    info!(unit = %artifact.unit, image = %artifact.image, "pushing");
                    registry.push(&artifact.image).await.map_err(|e| {
                        FlotillaError::PushFailed {
                            unit: artifact.unit.clone(),
                            message: e.to_string(),
                        }
                    })?;
                    Ok(PublishResult {
                        unit: artifact.unit.clone(),
                        pushed_tag: artifact.image.tag.clone(),
                        success: true,
                    })
                }
            })
            .buffer_unordered(ctx.jobs)
            .collect()
            .await;

        let mut pushed = Vec::with_capacity(results.len());
        let mut failure: Option<FlotillaError> = None;
        for result in results {
            match result {
                Ok(r) => pushed.push(r),
                Err(e) => {
                    error!(error = %e, "unit push failed");
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        pushed.sort_by(|a, b| a.unit.cmp(&b.unit));
        Ok(pushed)
    }
}
