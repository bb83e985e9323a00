//! Container build tool seam.

use crate::domain::error::Result;
use crate::domain::image::{ImageLabels, ImageRef};
use crate::domain::unit::Unit;
use async_trait::async_trait;
use std::time::Duration;

/// Operations the orchestrator needs from the underlying build tool.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Build an image from the unit's build descriptor and directory
    /// context, embedding the traceability labels. Returns the content
    /// identifier of the built image.
    async fn build(&self, unit: &Unit, image: &ImageRef, labels: &ImageLabels) -> Result<String>;

    /// Remove dangling (untagged) local images.
    async fn prune_dangling(&self) -> Result<()>;

    /// Drop build-tool cache entries older than the retention window.
    async fn prune_build_cache(&self, older_than: Duration) -> Result<()>;
}
