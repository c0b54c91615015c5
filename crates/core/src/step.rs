// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step kind tags shared across the workspace

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a workflow step.
///
/// The full per-kind payloads live in the workflow schema; this tag is
/// what results and events carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Python,
    Agent,
    Generate,
    Validate,
    Subworkflow,
    Branch,
    Parallel,
    Checkpoint,
}

impl StepKind {
    /// Stable lowercase name, matching the `type` field in workflow files.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Python => "python",
            StepKind::Agent => "agent",
            StepKind::Generate => "generate",
            StepKind::Validate => "validate",
            StepKind::Subworkflow => "subworkflow",
            StepKind::Branch => "branch",
            StepKind::Parallel => "parallel",
            StepKind::Checkpoint => "checkpoint",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepKind {
    type Err = UnknownStepKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" => Ok(StepKind::Python),
            "agent" => Ok(StepKind::Agent),
            "generate" => Ok(StepKind::Generate),
            "validate" => Ok(StepKind::Validate),
            "subworkflow" => Ok(StepKind::Subworkflow),
            "branch" => Ok(StepKind::Branch),
            "parallel" => Ok(StepKind::Parallel),
            "checkpoint" => Ok(StepKind::Checkpoint),
            other => Err(UnknownStepKind {
                found: other.to_string(),
            }),
        }
    }
}

/// A step kind string outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStepKind {
    pub found: String,
}

impl fmt::Display for UnknownStepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown step kind '{}'", self.found)
    }
}

impl std::error::Error for UnknownStepKind {}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
