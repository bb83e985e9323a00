//! Domain types shared by every pipeline stage.

pub mod decision;
pub mod error;
pub mod image;
pub mod revision;
pub mod unit;

pub use decision::{BuildArtifact, BuildDecision, DecisionReason, PublishResult};
pub use error::{FlotillaError, Result};
pub use image::{
    DeployTarget, ImageLabels, ImageRef, LABEL_AUTHOR, LABEL_BRANCH, LABEL_COMMIT,
    LABEL_DESCRIPTION, LABEL_RUN_ID, LABEL_TIMESTAMP,
};
pub use revision::Revision;
pub use unit::Unit;
