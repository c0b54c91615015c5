// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run execution context
//!
//! Three partitions: immutable `inputs`, append-only `steps` (written
//! only by the executor between steps via [`ExecutionContext::put_step_output`]),
//! and an optional `iteration` injected by fan-out drivers. Handlers get
//! read-only access.

use serde_json::{json, Map, Value};
use wl_core::StepKind;
use wl_expr::{Evaluator, Iteration};

/// The state a workflow run threads through its steps.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    workflow_name: String,
    inputs: Map<String, Value>,
    steps: Map<String, Value>,
    iteration: Option<Iteration>,
    /// (step name, rollback action name), in completion order.
    rollbacks: Vec<(String, String)>,
}

impl ExecutionContext {
    pub fn new(workflow_name: impl Into<String>, inputs: Map<String, Value>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            inputs,
            steps: Map::new(),
            iteration: None,
            rollbacks: Vec::new(),
        }
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    pub fn inputs(&self) -> &Map<String, Value> {
        &self.inputs
    }

    pub fn steps(&self) -> &Map<String, Value> {
        &self.steps
    }

    /// An evaluator over this context's partitions.
    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.inputs, &self.steps).with_iteration(self.iteration.as_ref())
    }

    /// Record a step's outcome for downstream expressions.
    ///
    /// Skipped steps store `output = null, success = true` so later
    /// references still dereference predictably.
    pub fn put_step_output(
        &mut self,
        name: &str,
        output: Value,
        success: bool,
        duration_ms: u64,
        kind: StepKind,
    ) {
        self.steps.insert(
            name.to_string(),
            json!({
                "output": output,
                "success": success,
                "duration_ms": duration_ms,
                "kind": kind.as_str(),
            }),
        );
    }

    /// Register a compensation to run if the workflow later fails.
    pub fn push_rollback(&mut self, step_name: &str, action_name: &str) {
        self.rollbacks
            .push((step_name.to_string(), action_name.to_string()));
    }

    /// Registered rollbacks in completion order; callers iterate in
    /// reverse for LIFO execution.
    pub fn pending_rollbacks(&self) -> &[(String, String)] {
        &self.rollbacks
    }

    /// A copy of this context with an iteration partition, for fan-out
    /// drivers that evaluate `item`/`index` references.
    pub fn with_iteration(&self, iteration: Iteration) -> Self {
        let mut child = self.clone();
        child.iteration = Some(iteration);
        child
    }

    /// Merge a child snapshot's newly recorded steps back in. Existing
    /// entries are not overwritten; the executor calls this after
    /// parallel children complete.
    pub fn absorb_steps(&mut self, child: &ExecutionContext) {
        for (name, state) in &child.steps {
            if !self.steps.contains_key(name) {
                self.steps.insert(name.clone(), state.clone());
            }
        }
        for (step, action) in &child.rollbacks {
            if !self.rollbacks.iter().any(|(s, a)| s == step && a == action) {
                self.rollbacks.push((step.clone(), action.clone()));
            }
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
