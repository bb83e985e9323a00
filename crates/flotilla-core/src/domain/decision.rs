//! Per-unit build decisions and stage results.

use crate::domain::image::ImageRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable reason behind a build decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// No image could be fetched for the unit's tag (absent or registry
    /// error). Conservative default: rebuild.
    NoExistingImage,

    /// The fetched image carries no commit label and cannot be trusted
    /// as current.
    NoCommitLabel,

    /// The existing image was built from the current commit.
    SameCommit,

    /// Files under the unit's subtree changed since the labeled commit.
    PathChanged,

    /// History advanced but the unit's subtree is untouched.
    PathUnchanged,

    /// The scoped diff query itself failed; undecidable state resolves
    /// toward rebuilding.
    DecisionError,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionReason::NoExistingImage => "no_existing_image",
            DecisionReason::NoCommitLabel => "no_commit_label",
            DecisionReason::SameCommit => "same_commit",
            DecisionReason::PathChanged => "path_changed",
            DecisionReason::PathUnchanged => "path_unchanged",
            DecisionReason::DecisionError => "decision_error",
        };
        f.write_str(s)
    }
}

/// The per-unit verdict on whether to rebuild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildDecision {
    /// Unit name.
    pub unit: String,

    /// Whether the unit enters the build set.
    pub needs_build: bool,

    /// Why.
    pub reason: DecisionReason,
}

impl BuildDecision {
    /// A decision that selects the unit for rebuilding.
    pub fn rebuild(unit: impl Into<String>, reason: DecisionReason) -> Self {
        Self {
            unit: unit.into(),
            needs_build: true,
            reason,
        }
    }

    /// A decision that skips the unit.
    pub fn skip(unit: impl Into<String>, reason: DecisionReason) -> Self {
        Self {
            unit: unit.into(),
            needs_build: false,
            reason,
        }
    }
}

/// The output of one successful unit build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildArtifact {
    /// Unit name.
    pub unit: String,

    /// Where the artifact will be published.
    pub image: ImageRef,

    /// Content identifier reported by the build tool.
    pub image_id: String,
}

/// Per-unit publish outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishResult {
    /// Unit name.
    pub unit: String,

    /// Tag the artifact was pushed under.
    pub pushed_tag: String,

    /// Whether the push succeeded.
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_constructors() {
        let d = BuildDecision::rebuild("app1", DecisionReason::NoExistingImage);
        assert!(d.needs_build);
        assert_eq!(d.reason, DecisionReason::NoExistingImage);

        let d = BuildDecision::skip("app1", DecisionReason::SameCommit);
        assert!(!d.needs_build);
        assert_eq!(d.reason, DecisionReason::SameCommit);
    }

    #[test]
    fn test_reason_display_matches_serde() {
        let reason = DecisionReason::PathUnchanged;
        let as_json = serde_json::to_string(&reason).unwrap();
        assert_eq!(as_json, format!("\"{}\"", reason));
    }
}
