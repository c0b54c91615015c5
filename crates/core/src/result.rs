// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution result records

use crate::step::StepKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single step.
///
/// Invariant: `success == false` iff `error` is `Some` and non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub kind: StepKind,
    pub success: bool,
    /// JSON-serializable output value. Skipped steps record `null`.
    #[serde(default)]
    pub output: Value,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    /// A successful result with the given output.
    pub fn ok(name: impl Into<String>, kind: StepKind, output: Value, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            kind,
            success: true,
            output,
            duration_ms,
            error: None,
        }
    }

    /// A failed result carrying the error message.
    pub fn failed(
        name: impl Into<String>,
        kind: StepKind,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            success: false,
            output: Value::Null,
            duration_ms,
            error: Some(error.into()),
        }
    }
}

/// A rollback action that failed while compensating for a workflow failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackError {
    pub step_name: String,
    pub error: String,
}

/// Terminal outcome of a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_name: String,
    pub success: bool,
    pub step_results: Vec<StepResult>,
    pub total_duration_ms: u64,
    /// Output of the last successful top-level step, or `null`.
    #[serde(default)]
    pub final_output: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rollback_errors: Vec<RollbackError>,
}

impl WorkflowResult {
    /// Result for a run that never started executing steps.
    pub fn aborted(workflow_name: impl Into<String>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            success: false,
            step_results: Vec::new(),
            total_duration_ms: 0,
            final_output: Value::Null,
            rollback_errors: Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
