//! Flotilla - incremental container build orchestration
//!
//! The `flotilla` command builds and publishes only the units of a
//! repository whose sources changed since their last published image.
//!
//! ## Commands
//!
//! - `run`: Full cycle: decide, build, publish, reclaim, report
//! - `decide`: Show per-unit rebuild decisions without building
//! - `discover`: List the buildable units of a repository

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

use flotilla_core::{
    discover_units, DeployTarget, DockerCli, GitCli, RegistryAuth, Vcs,
};
use flotilla_pipeline::{BuildPipeline, DecisionEngine, RunContext, RunOptions};

#[derive(Parser)]
#[command(name = "flotilla")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Incremental container build orchestrator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Deployment target controlling tag derivation.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TargetArg {
    /// Primary branches map to production, everything else to dev
    Auto,
    /// Force the production tag (`latest`)
    Production,
    /// Force the branch-derived tag
    Dev,
}

impl From<TargetArg> for DeployTarget {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Auto => DeployTarget::Auto,
            TargetArg::Production => DeployTarget::Production,
            TargetArg::Dev => DeployTarget::Dev,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decide, build, publish, and reclaim in one pass
    Run {
        /// Repository root to orchestrate
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Registry host to publish to
        #[arg(long, env = "FLOTILLA_REGISTRY")]
        registry: String,

        /// Repository namespace within the registry
        #[arg(long, env = "FLOTILLA_NAMESPACE")]
        namespace: String,

        /// Deployment target
        #[arg(long, value_enum, default_value_t = TargetArg::Auto)]
        target: TargetArg,

        /// Branch name override (useful in detached-HEAD checkouts)
        #[arg(long)]
        branch: Option<String>,

        /// Worker-pool width for parallel stages
        #[arg(long, default_value_t = 4)]
        jobs: usize,

        /// Leave this run's images in the local cache
        #[arg(long)]
        keep_images: bool,

        /// Print the run report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Evaluate rebuild decisions without building anything
    Decide {
        /// Repository root to inspect
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Registry host holding the published images
        #[arg(long, env = "FLOTILLA_REGISTRY")]
        registry: String,

        /// Repository namespace within the registry
        #[arg(long, env = "FLOTILLA_NAMESPACE")]
        namespace: String,

        /// Deployment target
        #[arg(long, value_enum, default_value_t = TargetArg::Auto)]
        target: TargetArg,

        /// Branch name override
        #[arg(long)]
        branch: Option<String>,

        /// Worker-pool width
        #[arg(long, default_value_t = 4)]
        jobs: usize,
    },

    /// List the buildable units of a repository
    Discover {
        /// Repository root to scan
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    flotilla_core::init_tracing(cli.json_logs, level);

    match cli.command {
        Commands::Run {
            repo,
            registry,
            namespace,
            target,
            branch,
            jobs,
            keep_images,
            json,
        } => {
            cmd_run(
                repo,
                registry,
                namespace,
                target.into(),
                branch,
                jobs,
                keep_images,
                json,
            )
            .await
        }
        Commands::Decide {
            repo,
            registry,
            namespace,
            target,
            branch,
            jobs,
        } => cmd_decide(repo, registry, namespace, target.into(), branch, jobs).await,
        Commands::Discover { repo } => cmd_discover(&repo),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    repo: PathBuf,
    registry: String,
    namespace: String,
    target: DeployTarget,
    branch: Option<String>,
    jobs: usize,
    keep_images: bool,
    json: bool,
) -> Result<()> {
    let docker = Arc::new(DockerCli::new());
    let pipeline = BuildPipeline::new(Arc::new(GitCli::new()), docker.clone(), docker);

    let report = pipeline
        .run(RunOptions {
            repo_root: repo,
            registry,
            namespace,
            target,
            branch_override: branch,
            jobs,
            keep_images,
            auth: RegistryAuth::from_env(),
        })
        .await
        .context("Run failed")?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

/// Reject blank registry coordinates before they end up in image refs.
/// The full pipeline performs the same check; `decide` builds its
/// context directly and needs it here.
fn validate_coordinates(registry: &str, namespace: &str) -> Result<()> {
    if registry.trim().is_empty() {
        anyhow::bail!("registry host must not be empty");
    }
    if namespace.trim().is_empty() {
        anyhow::bail!("registry namespace must not be empty");
    }
    Ok(())
}

async fn cmd_decide(
    repo: PathBuf,
    registry: String,
    namespace: String,
    target: DeployTarget,
    branch: Option<String>,
    jobs: usize,
) -> Result<()> {
    validate_coordinates(&registry, &namespace)?;

    let units = discover_units(&repo).context("Unit discovery failed")?;
    if units.is_empty() {
        println!("no buildable units found");
        return Ok(());
    }

    let vcs = Arc::new(GitCli::new());
    let revision = vcs
        .head_revision(&repo, branch.as_deref())
        .await
        .context("Failed to resolve repository revision")?;

    let ctx = RunContext::new(repo, revision, target, registry, namespace, jobs, false);
    let docker = Arc::new(DockerCli::new());
    let decisions = DecisionEngine::new(docker, vcs).decide_all(&units, &ctx).await;

    for decision in decisions {
        let verdict = if decision.needs_build { "build" } else { "skip" };
        println!("{:<20} {:<6} {}", decision.unit, verdict, decision.reason);
    }
    Ok(())
}

fn cmd_discover(repo: &PathBuf) -> Result<()> {
    let units = discover_units(repo).context("Unit discovery failed")?;
    if units.is_empty() {
        println!("no buildable units found");
        return Ok(());
    }
    for unit in units {
        println!("{:<20} {}", unit.name, unit.dir.display());
    }
    Ok(())
}
