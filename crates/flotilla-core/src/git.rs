//! Git integration: revision resolution and path-scoped history diffing.

use crate::domain::error::{FlotillaError, Result};
use crate::domain::revision::Revision;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Version-control seam used by the decision engine and run driver.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Resolve the identity of the current checkout. An explicit branch
    /// override bypasses branch detection entirely.
    async fn head_revision(&self, repo: &Path, branch_override: Option<&str>) -> Result<Revision>;

    /// File paths changed between two specific commits, restricted to
    /// one subtree. Uses a two-dot range: the literal history between
    /// `from` and `to`, not a merge-base comparison.
    async fn changed_paths(
        &self,
        repo: &Path,
        from: &str,
        to: &str,
        scope: &Path,
    ) -> Result<Vec<PathBuf>>;
}

/// `Vcs` implementation shelling out to the `git` binary.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, repo: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(repo)
            .output()
            .await
            .map_err(|e| FlotillaError::Git(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FlotillaError::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn detect_branch(&self, repo: &Path) -> Result<String> {
        let branch = self.run(repo, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if branch != "HEAD" {
            return Ok(branch);
        }
        // Detached HEAD (the usual state on CI checkouts): fall back to
        // the nearest ref name.
        self.run(repo, &["name-rev", "--name-only", "HEAD"]).await
    }
}

/// Strip remote prefixes from a branch name: `remotes/origin/main`,
/// `origin/main`, and `main` all normalize to `main`. Branch names that
/// merely contain a slash (`feature/x`) are left intact.
pub fn normalize_branch(branch: &str) -> String {
    let trimmed = branch.strip_prefix("remotes/").unwrap_or(branch);
    let trimmed = trimmed.strip_prefix("origin/").unwrap_or(trimmed);
    // name-rev can append an offset such as `main~2`; the branch is the
    // part before the first history operator.
    let trimmed = trimmed
        .split(['~', '^'])
        .next()
        .unwrap_or(trimmed);
    trimmed.to_string()
}

#[async_trait]
impl Vcs for GitCli {
    async fn head_revision(&self, repo: &Path, branch_override: Option<&str>) -> Result<Revision> {
        let commit = self.run(repo, &["rev-parse", "HEAD"]).await?;
        if commit.is_empty() {
            return Err(FlotillaError::Git(
                "git rev-parse HEAD returned empty output".to_string(),
            ));
        }
        let short_commit = self.run(repo, &["rev-parse", "--short", "HEAD"]).await?;
        let author = self.run(repo, &["log", "-1", "--format=%an"]).await?;
        let message = self.run(repo, &["log", "-1", "--format=%s"]).await?;

        let branch = match branch_override {
            Some(name) => name.to_string(),
            None => self.detect_branch(repo).await?,
        };

        Ok(Revision {
            commit,
            short_commit,
            author,
            message,
            branch: normalize_branch(&branch),
        })
    }

    async fn changed_paths(
        &self,
        repo: &Path,
        from: &str,
        to: &str,
        scope: &Path,
    ) -> Result<Vec<PathBuf>> {
        let range = format!("{from}..{to}");
        let scope = scope.to_string_lossy();
        let stdout = self
            .run(repo, &["diff", "--name-only", &range, "--", &scope])
            .await?;

        Ok(stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_remote_prefixes() {
        assert_eq!(normalize_branch("main"), "main");
        assert_eq!(normalize_branch("origin/main"), "main");
        assert_eq!(normalize_branch("remotes/origin/main"), "main");
        assert_eq!(normalize_branch("remotes/origin/feature/x"), "feature/x");
    }

    #[test]
    fn test_normalize_keeps_slashed_branch_names() {
        assert_eq!(normalize_branch("feature/x"), "feature/x");
        assert_eq!(normalize_branch("release/1.2"), "release/1.2");
    }

    #[test]
    fn test_normalize_drops_name_rev_offsets() {
        assert_eq!(normalize_branch("main~2"), "main");
        assert_eq!(normalize_branch("origin/main^0"), "main");
    }
}
