//! Flotilla Pipeline - incremental build orchestration
//!
//! Provides the run driver that:
//! - Decides per unit whether its published image is stale
//! - Builds and publishes only the stale units, in parallel, fail-fast
//! - Always reclaims local disk resources afterwards

pub mod build;
pub mod context;
pub mod decision;
pub mod pipeline;
pub mod publish;
pub mod reclaim;
pub mod report;

// Re-export key types
pub use build::BuildCoordinator;
pub use context::RunContext;
pub use decision::DecisionEngine;
pub use pipeline::{BuildPipeline, RunOptions};
pub use publish::PublishCoordinator;
pub use reclaim::{Reclaimer, BUILD_CACHE_RETENTION};
pub use report::{RunOutcome, RunReport, UnitReport};
