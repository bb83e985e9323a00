//! Run summary: what happened, per unit, and how to pull the results.

use flotilla_core::{DecisionReason, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The repository contains no buildable units. Not an error.
    NoUnits,

    /// Units exist but every published image is current.
    NoChanges,

    /// At least one unit was rebuilt and published.
    Built,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunOutcome::NoUnits => "no_units",
            RunOutcome::NoChanges => "no_changes",
            RunOutcome::Built => "built",
        };
        f.write_str(s)
    }
}

/// One unit's line in the summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitReport {
    pub name: String,
    pub needs_build: bool,
    pub reason: DecisionReason,
    /// Full image reference, present when this run pushed the unit.
    pub pushed_image: Option<String>,
}

/// Complete summary of one run, renderable as text or JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: String,
    pub branch: String,
    pub commit_short: String,
    pub author: String,
    pub deploy_target: String,
    pub registry: String,
    pub namespace: String,
    pub outcome: RunOutcome,
    pub units: Vec<UnitReport>,
}

impl RunReport {
    /// Human-readable summary. Stable ordering: units appear sorted by
    /// name, as produced by the pipeline.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "run {}", self.run_id);
        let _ = writeln!(
            out,
            "branch {} @ {} by {} (target: {})",
            self.branch, self.commit_short, self.author, self.deploy_target
        );
        let _ = writeln!(out, "outcome: {}", self.outcome);

        match self.outcome {
            RunOutcome::NoUnits => {
                let _ = writeln!(out, "no buildable units found");
            }
            RunOutcome::NoChanges => {
                let _ = writeln!(out, "all published images are current");
            }
            RunOutcome::Built => {}
        }

        for unit in &self.units {
            let verdict = if unit.needs_build { "build" } else { "skip" };
            let _ = writeln!(out, "  {:<20} {:<6} {}", unit.name, verdict, unit.reason);
        }

        let pushed: Vec<&UnitReport> = self
            .units
            .iter()
            .filter(|u| u.pushed_image.is_some())
            .collect();
        if !pushed.is_empty() {
            let _ = writeln!(out, "published to {}/{}:", self.registry, self.namespace);
            for unit in pushed {
                if let Some(image) = &unit.pushed_image {
                    let _ = writeln!(out, "  docker pull {image}");
                }
            }
        }

        out
    }

    /// Pretty-printed JSON rendering.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
