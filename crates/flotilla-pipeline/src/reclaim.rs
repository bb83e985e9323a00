//! Resource reclaimer: best-effort cleanup of the local build host.

use flotilla_core::{obs, ImageBuilder, ImageRef, ImageRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How far back the build cache is kept before pruning.
pub const BUILD_CACHE_RETENTION: Duration = Duration::from_secs(72 * 60 * 60);

/// Cleans the local image cache after a run.
///
/// Reclamation is strictly best-effort: every step failure is logged at
/// warning level and swallowed, because a full disk tomorrow is a
/// better outcome than failing a run whose images already shipped.
pub struct Reclaimer {
    registry: Arc<dyn ImageRegistry>,
    builder: Arc<dyn ImageBuilder>,
}

impl Reclaimer {
    pub fn new(registry: Arc<dyn ImageRegistry>, builder: Arc<dyn ImageBuilder>) -> Self {
        Self { registry, builder }
    }

    /// Reclaim local resources. Never fails.
    ///
    /// `images` are this run's references; they are removed from the
    /// local cache unless `keep_images` is set. Dangling images and the
    /// aged part of the build cache are pruned regardless.
    pub async fn reclaim(&self, keep_images: bool, images: &[ImageRef]) {
        if keep_images {
            debug!(count = images.len(), "keeping this run's images in the local cache");
        } else {
            for image in images {
                if let Err(e) = self.registry.remove_local(image).await {
                    obs::emit_reclaim_warning("remove_local", &e);
                }
            }
        }

        if let Err(e) = self.builder.prune_dangling().await {
            obs::emit_reclaim_warning("prune_dangling", &e);
        }

        if let Err(e) = self.builder.prune_build_cache(BUILD_CACHE_RETENTION).await {
            obs::emit_reclaim_warning("prune_build_cache", &e);
        }

        info!(images = images.len(), keep_images, "reclamation finished");
    }
}
