//! Registry image coordinates, tag derivation, and traceability labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label key for the commit an image was built from.
pub const LABEL_COMMIT: &str = "org.flotilla.commit";
/// Label key for the branch an image was built from.
pub const LABEL_BRANCH: &str = "org.flotilla.branch";
/// Label key for the commit author.
pub const LABEL_AUTHOR: &str = "org.flotilla.author";
/// Label key for the orchestrator run id.
pub const LABEL_RUN_ID: &str = "org.flotilla.run-id";
/// Label key for the build timestamp (RFC 3339).
pub const LABEL_TIMESTAMP: &str = "org.flotilla.timestamp";
/// Label key for the human-readable build description.
pub const LABEL_DESCRIPTION: &str = "org.flotilla.description";

/// Branch names that map to the production target under `Auto`.
const PRIMARY_BRANCHES: [&str; 2] = ["main", "master"];

/// Where published artifacts are destined.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeployTarget {
    /// Derive from the branch: a primary branch maps to production,
    /// anything else to dev.
    Auto,

    /// Tag images `latest`.
    Production,

    /// Tag images with the sanitized branch name.
    Dev,
}

impl DeployTarget {
    /// Derive the image tag for this target on the given branch.
    ///
    /// This is the single tag-derivation rule: every stage (decision,
    /// build, push, reclaim) must go through it.
    pub fn derive_tag(self, branch: &str) -> String {
        match self {
            DeployTarget::Production => "latest".to_string(),
            DeployTarget::Dev => sanitize_tag(branch),
            DeployTarget::Auto => {
                if PRIMARY_BRANCHES.contains(&branch) {
                    "latest".to_string()
                } else {
                    sanitize_tag(branch)
                }
            }
        }
    }
}

impl fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeployTarget::Auto => "auto",
            DeployTarget::Production => "production",
            DeployTarget::Dev => "dev",
        };
        f.write_str(s)
    }
}

/// Sanitize a branch name into a valid image tag: characters outside
/// `[a-zA-Z0-9._-]` become `-`, then the whole string is lower-cased.
pub fn sanitize_tag(branch: &str) -> String {
    branch
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Fully-qualified coordinates of a published artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ImageRef {
    /// Registry host, e.g. `registry.example.com`.
    pub registry: String,

    /// Repository namespace within the registry.
    pub namespace: String,

    /// Unit name.
    pub name: String,

    /// Derived tag.
    pub tag: String,
}

impl ImageRef {
    /// Build the image reference for one unit under the tag-derivation rule.
    pub fn for_unit(
        registry: &str,
        namespace: &str,
        unit_name: &str,
        target: DeployTarget,
        branch: &str,
    ) -> Self {
        Self {
            registry: registry.to_string(),
            namespace: namespace.to_string(),
            name: unit_name.to_string(),
            tag: target.derive_tag(branch),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}:{}",
            self.registry, self.namespace, self.name, self.tag
        )
    }
}

/// Traceability metadata embedded into every built image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageLabels {
    pub commit: String,
    pub branch: String,
    pub author: String,
    pub run_id: String,
    pub timestamp: String,
    pub description: String,
}

impl ImageLabels {
    /// Label key/value pairs in the order they are passed to the build tool.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        vec![
            (LABEL_COMMIT, self.commit.as_str()),
            (LABEL_BRANCH, self.branch.as_str()),
            (LABEL_AUTHOR, self.author.as_str()),
            (LABEL_RUN_ID, self.run_id.as_str()),
            (LABEL_TIMESTAMP, self.timestamp.as_str()),
            (LABEL_DESCRIPTION, self.description.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_collapses_and_lowercases() {
        assert_eq!(sanitize_tag("Feature/X_1"), "feature-x_1");
        assert_eq!(sanitize_tag("release-1.2.3"), "release-1.2.3");
        assert_eq!(sanitize_tag("fix/NPE in parser"), "fix-npe-in-parser");
        assert_eq!(sanitize_tag("héllo"), "h-llo");
    }

    #[test]
    fn test_tag_derivation_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(DeployTarget::Dev.derive_tag("Feature/X_1"), "feature-x_1");
        }
    }

    #[test]
    fn test_production_always_latest() {
        assert_eq!(DeployTarget::Production.derive_tag("feature/x"), "latest");
        assert_eq!(DeployTarget::Production.derive_tag("main"), "latest");
    }

    #[test]
    fn test_auto_maps_primary_branches_to_latest() {
        assert_eq!(DeployTarget::Auto.derive_tag("main"), "latest");
        assert_eq!(DeployTarget::Auto.derive_tag("master"), "latest");
        assert_eq!(DeployTarget::Auto.derive_tag("develop"), "develop");
        // A branch that merely contains "main" is not primary.
        assert_eq!(DeployTarget::Auto.derive_tag("main-hotfix"), "main-hotfix");
    }

    #[test]
    fn test_image_ref_display() {
        let image = ImageRef::for_unit(
            "registry.example.com",
            "apps",
            "app1",
            DeployTarget::Auto,
            "develop",
        );
        assert_eq!(image.to_string(), "registry.example.com/apps/app1:develop");
    }

    #[test]
    fn test_label_pairs_order_and_keys() {
        let labels = ImageLabels {
            commit: "abc".to_string(),
            branch: "main".to_string(),
            author: "a".to_string(),
            run_id: "r".to_string(),
            timestamp: "t".to_string(),
            description: "d".to_string(),
        };
        let pairs = labels.pairs();
        assert_eq!(pairs.len(), 6);
        assert_eq!(pairs[0], (LABEL_COMMIT, "abc"));
        assert_eq!(pairs[5].0, LABEL_DESCRIPTION);
    }
}
