//! Flotilla Core Library
//!
//! Domain model and external collaborators for the Flotilla build
//! orchestrator: unit discovery, git revision resolution, and the
//! registry/build-tool clients that the pipeline crate drives.

pub mod builder;
pub mod discovery;
pub mod docker;
pub mod domain;
pub mod fakes;
pub mod git;
pub mod obs;
pub mod registry;
pub mod telemetry;

pub use domain::{
    BuildArtifact, BuildDecision, DecisionReason, DeployTarget, FlotillaError, ImageLabels,
    ImageRef, PublishResult, Result, Revision, Unit, LABEL_AUTHOR, LABEL_BRANCH, LABEL_COMMIT,
    LABEL_DESCRIPTION, LABEL_RUN_ID, LABEL_TIMESTAMP,
};

pub use builder::ImageBuilder;
pub use discovery::discover_units;
pub use docker::DockerCli;
pub use git::{GitCli, Vcs};
pub use registry::{ImageRegistry, RegistryAuth};
pub use telemetry::init_tracing;

/// Flotilla version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
