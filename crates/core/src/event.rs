// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress events emitted during workflow execution
//!
//! Serializes with `{"event": "step:started", ...fields}` format. Consumers
//! (CLI renderer, session journal) match on the tag; there is no event
//! base type.

use crate::step::StepKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Kind of text chunk streamed from an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Output,
    Thinking,
    Error,
}

/// Severity level for informational step output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Events emitted by the executor, in total order for one run.
///
/// Every variant carries `timestamp_ms` (epoch milliseconds). Events from
/// nested steps (parallel children, sub-workflows, branch bodies) carry a
/// `step_path` such as `deploy/2/migrate` for tree consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    // -- validation --
    #[serde(rename = "validation:started")]
    ValidationStarted { workflow_name: String, timestamp_ms: u64 },

    #[serde(rename = "validation:completed")]
    ValidationCompleted {
        workflow_name: String,
        warnings_count: usize,
        timestamp_ms: u64,
    },

    #[serde(rename = "validation:failed")]
    ValidationFailed {
        workflow_name: String,
        errors: Vec<String>,
        timestamp_ms: u64,
    },

    // -- preflight --
    #[serde(rename = "preflight:started")]
    PreflightStarted {
        prerequisites: Vec<String>,
        timestamp_ms: u64,
    },

    #[serde(rename = "preflight:check_passed")]
    PreflightCheckPassed {
        name: String,
        display_name: String,
        duration_ms: u64,
        message: String,
        timestamp_ms: u64,
    },

    #[serde(rename = "preflight:check_failed")]
    PreflightCheckFailed {
        name: String,
        display_name: String,
        duration_ms: u64,
        message: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        remediation: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        affected_steps: Vec<String>,
        timestamp_ms: u64,
    },

    #[serde(rename = "preflight:completed")]
    PreflightCompleted {
        success: bool,
        total_duration_ms: u64,
        passed_count: usize,
        failed_count: usize,
        timestamp_ms: u64,
    },

    // -- workflow --
    #[serde(rename = "workflow:started")]
    WorkflowStarted {
        workflow_name: String,
        inputs: BTreeMap<String, Value>,
        /// Nesting depth: 0 for the top-level run, +1 per sub-workflow.
        #[serde(default)]
        depth: usize,
        timestamp_ms: u64,
    },

    #[serde(rename = "workflow:completed")]
    WorkflowCompleted {
        workflow_name: String,
        success: bool,
        total_duration_ms: u64,
        #[serde(default)]
        depth: usize,
        timestamp_ms: u64,
    },

    // -- steps --
    #[serde(rename = "step:started")]
    StepStarted {
        step_name: String,
        kind: StepKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_path: Option<String>,
        timestamp_ms: u64,
    },

    #[serde(rename = "step:completed")]
    StepCompleted {
        step_name: String,
        kind: StepKind,
        success: bool,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_path: Option<String>,
        timestamp_ms: u64,
    },

    /// Informational output from any step kind (actions, validation stages,
    /// registry-provided components).
    #[serde(rename = "step:output")]
    StepOutput {
        step_name: String,
        message: String,
        level: OutputLevel,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        timestamp_ms: u64,
    },

    /// Streaming text from an agent invocation.
    #[serde(rename = "agent:chunk")]
    AgentStreamChunk {
        step_name: String,
        agent_name: String,
        text: String,
        chunk_type: ChunkType,
        timestamp_ms: u64,
    },

    // -- loops --
    #[serde(rename = "loop:iteration_started")]
    LoopIterationStarted {
        step_name: String,
        iteration_index: usize,
        total_iterations: usize,
        item_label: String,
        timestamp_ms: u64,
    },

    #[serde(rename = "loop:iteration_completed")]
    LoopIterationCompleted {
        step_name: String,
        iteration_index: usize,
        success: bool,
        duration_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        timestamp_ms: u64,
    },

    // -- checkpoints --
    #[serde(rename = "checkpoint:saved")]
    CheckpointSaved {
        step_name: String,
        workflow_name: String,
        checkpoint_id: String,
        timestamp_ms: u64,
    },

    // -- rollback --
    #[serde(rename = "rollback:started")]
    RollbackStarted { step_name: String, timestamp_ms: u64 },

    #[serde(rename = "rollback:completed")]
    RollbackCompleted {
        step_name: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        timestamp_ms: u64,
    },

    #[serde(rename = "rollback:error")]
    RollbackErrorEvent {
        step_name: String,
        error: String,
        timestamp_ms: u64,
    },
}

impl Event {
    /// Short tag for tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Event::ValidationStarted { .. } => "validation:started",
            Event::ValidationCompleted { .. } => "validation:completed",
            Event::ValidationFailed { .. } => "validation:failed",
            Event::PreflightStarted { .. } => "preflight:started",
            Event::PreflightCheckPassed { .. } => "preflight:check_passed",
            Event::PreflightCheckFailed { .. } => "preflight:check_failed",
            Event::PreflightCompleted { .. } => "preflight:completed",
            Event::WorkflowStarted { .. } => "workflow:started",
            Event::WorkflowCompleted { .. } => "workflow:completed",
            Event::StepStarted { .. } => "step:started",
            Event::StepCompleted { .. } => "step:completed",
            Event::StepOutput { .. } => "step:output",
            Event::AgentStreamChunk { .. } => "agent:chunk",
            Event::LoopIterationStarted { .. } => "loop:iteration_started",
            Event::LoopIterationCompleted { .. } => "loop:iteration_completed",
            Event::CheckpointSaved { .. } => "checkpoint:saved",
            Event::RollbackStarted { .. } => "rollback:started",
            Event::RollbackCompleted { .. } => "rollback:completed",
            Event::RollbackErrorEvent { .. } => "rollback:error",
        }
    }

    /// Epoch-millisecond timestamp carried by the event.
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Event::ValidationStarted { timestamp_ms, .. }
            | Event::ValidationCompleted { timestamp_ms, .. }
            | Event::ValidationFailed { timestamp_ms, .. }
            | Event::PreflightStarted { timestamp_ms, .. }
            | Event::PreflightCheckPassed { timestamp_ms, .. }
            | Event::PreflightCheckFailed { timestamp_ms, .. }
            | Event::PreflightCompleted { timestamp_ms, .. }
            | Event::WorkflowStarted { timestamp_ms, .. }
            | Event::WorkflowCompleted { timestamp_ms, .. }
            | Event::StepStarted { timestamp_ms, .. }
            | Event::StepCompleted { timestamp_ms, .. }
            | Event::StepOutput { timestamp_ms, .. }
            | Event::AgentStreamChunk { timestamp_ms, .. }
            | Event::LoopIterationStarted { timestamp_ms, .. }
            | Event::LoopIterationCompleted { timestamp_ms, .. }
            | Event::CheckpointSaved { timestamp_ms, .. }
            | Event::RollbackStarted { timestamp_ms, .. }
            | Event::RollbackCompleted { timestamp_ms, .. }
            | Event::RollbackErrorEvent { timestamp_ms, .. } => *timestamp_ms,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
