//! Artifact registry seam.

use crate::domain::error::Result;
use crate::domain::image::ImageRef;
use async_trait::async_trait;

/// Credentials for the artifact registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
}

impl RegistryAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read credentials from `FLOTILLA_REGISTRY_USER` /
    /// `FLOTILLA_REGISTRY_PASSWORD`. Returns `None` when either is
    /// unset, in which case pushes rely on an ambient login session.
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("FLOTILLA_REGISTRY_USER").ok()?;
        let password = std::env::var("FLOTILLA_REGISTRY_PASSWORD").ok()?;
        Some(Self { username, password })
    }
}

/// Operations the orchestrator needs from the artifact registry.
///
/// Implementations must fail outright rather than hang; the decision
/// engine treats every fetch failure as "rebuild", never as "skip".
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Open a session against the registry host. Called once per publish
    /// batch, not per unit.
    async fn login(&self, registry: &str, auth: &RegistryAuth) -> Result<()>;

    /// Terminate the session. Called on both success and failure paths.
    async fn logout(&self, registry: &str) -> Result<()>;

    /// Fetch an image into the local cache. An error means the image is
    /// absent or the registry is unreachable; callers must not
    /// distinguish the two.
    async fn pull(&self, image: &ImageRef) -> Result<()>;

    /// Read one embedded label from a locally cached image. `None` when
    /// the label is absent.
    async fn image_label(&self, image: &ImageRef, key: &str) -> Result<Option<String>>;

    /// Publish a locally built image under its tag.
    async fn push(&self, image: &ImageRef) -> Result<()>;

    /// Delete the locally cached copy of an image. Never touches
    /// registry state.
    async fn remove_local(&self, image: &ImageRef) -> Result<()>;
}
