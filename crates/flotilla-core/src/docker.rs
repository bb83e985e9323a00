//! Docker CLI client implementing both the registry and build-tool seams.

use crate::builder::ImageBuilder;
use crate::domain::error::{FlotillaError, Result};
use crate::domain::image::{ImageLabels, ImageRef};
use crate::domain::unit::Unit;
use crate::registry::{ImageRegistry, RegistryAuth};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Optional per-unit dependency declaration. Units without one get an
/// empty placeholder so every unit builds through the same descriptor.
pub const DEPENDENCY_FILE: &str = "requirements.txt";

/// Client driving the `docker` binary (or a drop-in such as `podman`).
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    /// Use a different CLI-compatible binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!(program = %self.program, args = ?args, "running build tool");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| FlotillaError::BuildTool(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FlotillaError::BuildTool(format!(
                "{} {} failed: {}",
                self.program,
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Map `docker inspect --format` output to an optional label value.
/// Docker prints `<no value>` when the template key is missing.
fn parse_label_output(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "<no value>" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[async_trait]
impl ImageRegistry for DockerCli {
    async fn login(&self, registry: &str, auth: &RegistryAuth) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(["login", registry, "--username", &auth.username, "--password-stdin"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FlotillaError::Registry(format!("failed to run {} login: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(auth.password.as_bytes())
                .await
                .map_err(|e| FlotillaError::Registry(format!("login stdin: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| FlotillaError::Registry(format!("login: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FlotillaError::Registry(format!(
                "login to {registry} failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn logout(&self, registry: &str) -> Result<()> {
        self.run(&["logout", registry])
            .await
            .map_err(|e| FlotillaError::Registry(e.to_string()))?;
        Ok(())
    }

    async fn pull(&self, image: &ImageRef) -> Result<()> {
        let reference = image.to_string();
        self.run(&["pull", &reference])
            .await
            .map_err(|e| FlotillaError::Registry(e.to_string()))?;
        Ok(())
    }

    async fn image_label(&self, image: &ImageRef, key: &str) -> Result<Option<String>> {
        let reference = image.to_string();
        let format = format!("{{{{ index .Config.Labels \"{key}\" }}}}");
        let raw = self
            .run(&["inspect", "--format", &format, &reference])
            .await
            .map_err(|e| FlotillaError::Registry(e.to_string()))?;
        Ok(parse_label_output(&raw))
    }

    async fn push(&self, image: &ImageRef) -> Result<()> {
        let reference = image.to_string();
        self.run(&["push", &reference])
            .await
            .map_err(|e| FlotillaError::Registry(e.to_string()))?;
        Ok(())
    }

    async fn remove_local(&self, image: &ImageRef) -> Result<()> {
        let reference = image.to_string();
        self.run(&["rmi", &reference])
            .await
            .map_err(|e| FlotillaError::Registry(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageBuilder for DockerCli {
    async fn build(&self, unit: &Unit, image: &ImageRef, labels: &ImageLabels) -> Result<String> {
        // Units without a dependency declaration still build through the
        // shared descriptor; substitute an empty placeholder.
        let dependency_file = unit.dir.join(DEPENDENCY_FILE);
        if !dependency_file.is_file() {
            debug!(unit = %unit.name, "no dependency file, writing empty placeholder");
            tokio::fs::write(&dependency_file, b"").await?;
        }

        let reference = image.to_string();
        let dockerfile = unit.dockerfile.to_string_lossy().to_string();
        let context = unit.dir.to_string_lossy().to_string();

        let mut args: Vec<String> = vec![
            "build".to_string(),
            "-q".to_string(),
            "-f".to_string(),
            dockerfile,
            "-t".to_string(),
            reference,
        ];
        for (key, value) in labels.pairs() {
            args.push("--label".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(context);

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let image_id = self.run(&arg_refs).await?;
        Ok(image_id)
    }

    async fn prune_dangling(&self) -> Result<()> {
        self.run(&["image", "prune", "-f"]).await?;
        Ok(())
    }

    async fn prune_build_cache(&self, older_than: Duration) -> Result<()> {
        let until = format!("{}h", older_than.as_secs() / 3600);
        self.run(&["builder", "prune", "-f", "--filter", &format!("until={until}")])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_output() {
        assert_eq!(parse_label_output("abc123\n"), Some("abc123".to_string()));
        assert_eq!(parse_label_output("<no value>"), None);
        assert_eq!(parse_label_output("  "), None);
        assert_eq!(parse_label_output(""), None);
    }

    #[test]
    fn test_with_program() {
        let cli = DockerCli::with_program("podman");
        assert_eq!(cli.program, "podman");
    }
}
