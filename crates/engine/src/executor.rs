// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow executor
//!
//! The state machine that drives a document to a terminal result. One
//! run is single-threaded cooperative; concurrency appears only in
//! parallel-step fan-out and the subprocess runner's I/O pumps. Events
//! are emitted over the executor's `mpsc::Sender<Event>` in the stream's
//! total order.

use crate::checkpoint::{input_hash, CheckpointError, CheckpointStore, FileCheckpointStore};
use crate::component::EventEmitter;
use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::preflight::{run_preflight, PreflightCheck};
use crate::registry::ComponentRegistry;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use wl_core::{now_ms, Event, RollbackError, StepResult, WorkflowResult};
use wl_expr::{is_truthy, ExprError};
use wl_workflow::{validate_semantics, StepDef, WorkflowDocument};

/// How a run treats existing checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeMode {
    /// Resume from the latest checkpoint when one exists.
    #[default]
    Auto,
    /// Fail with checkpoint-not-found unless a checkpoint exists.
    Required,
    /// Delete existing checkpoints and run from the beginning.
    Restart,
}

/// Per-run options.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Run semantic validation before execution. On by default; disable
    /// only for pre-validated documents.
    pub validate: bool,
    pub resume: ResumeMode,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            validate: true,
            resume: ResumeMode::Auto,
        }
    }
}

/// Executes workflow documents using registered components.
///
/// Cheap to clone; parallel fan-out clones the executor into each
/// child task.
#[derive(Clone)]
pub struct WorkflowExecutor {
    pub(crate) registry: Arc<ComponentRegistry>,
    pub(crate) checkpoint_store: Arc<dyn CheckpointStore>,
    preflight: Arc<BTreeMap<String, Arc<dyn PreflightCheck>>>,
    pub(crate) event_tx: mpsc::Sender<Event>,
    cancelled: Arc<AtomicBool>,
}

impl WorkflowExecutor {
    pub fn new(registry: Arc<ComponentRegistry>, event_tx: mpsc::Sender<Event>) -> Self {
        Self {
            registry,
            checkpoint_store: Arc::new(FileCheckpointStore::default()),
            preflight: Arc::new(BTreeMap::new()),
            event_tx,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use a custom checkpoint store (tests, alternate roots).
    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoint_store = store;
        self
    }

    /// Install the preflight checks workflows may reference by name.
    pub fn with_preflight_checks(mut self, checks: Vec<Arc<dyn PreflightCheck>>) -> Self {
        let map = checks
            .into_iter()
            .map(|check| (check.name().to_string(), check))
            .collect();
        self.preflight = Arc::new(map);
        self
    }

    /// Request cooperative cancellation: the current step finishes, no
    /// new steps start, rollbacks still run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) async fn emit(&self, event: Event) {
        let _ = self.event_tx.send(event).await;
    }

    /// Run a document to completion.
    ///
    /// Pre-run aborts (invalid inputs, checkpoint input mismatch,
    /// store failures) surface as [`EngineError`]; everything after the
    /// first step event is carried in the returned [`WorkflowResult`].
    pub async fn run(
        &self,
        document: &WorkflowDocument,
        user_inputs: Map<String, Value>,
        options: &ExecutorOptions,
    ) -> Result<WorkflowResult, EngineError> {
        if options.resume == ResumeMode::Restart {
            self.checkpoint_store.delete_all(&document.name)?;
        }

        if options.validate {
            self.emit(Event::ValidationStarted {
                workflow_name: document.name.clone(),
                timestamp_ms: now_ms(),
            })
            .await;

            let validation = validate_semantics(document, self.registry.as_ref());
            if !validation.valid() {
                self.emit(Event::ValidationFailed {
                    workflow_name: document.name.clone(),
                    errors: validation.errors.iter().map(|e| e.to_string()).collect(),
                    timestamp_ms: now_ms(),
                })
                .await;
                self.emit(Event::WorkflowCompleted {
                    workflow_name: document.name.clone(),
                    success: false,
                    total_duration_ms: 0,
                    depth: 0,
                    timestamp_ms: now_ms(),
                })
                .await;
                return Ok(WorkflowResult::aborted(&document.name));
            }

            self.emit(Event::ValidationCompleted {
                workflow_name: document.name.clone(),
                warnings_count: validation.warnings.len(),
                timestamp_ms: now_ms(),
            })
            .await;
        }

        let inputs = merge_inputs(document, user_inputs)?;

        let checkpoint = match options.resume {
            ResumeMode::Restart => None,
            ResumeMode::Auto => self.checkpoint_store.load_latest(&document.name)?,
            ResumeMode::Required => Some(
                self.checkpoint_store
                    .load_latest(&document.name)?
                    .ok_or_else(|| CheckpointError::NotFound {
                        workflow_name: document.name.clone(),
                    })?,
            ),
        };

        if let Some(checkpoint) = &checkpoint {
            let actual = input_hash(&inputs);
            if actual != checkpoint.input_hash {
                return Err(EngineError::InputMismatch {
                    expected: checkpoint.input_hash.clone(),
                    actual,
                });
            }
        }

        if !document.preflight.is_empty() {
            let outcome =
                run_preflight(&self.preflight, &document.preflight, &self.event_tx).await;
            if !outcome.success() {
                tracing::warn!(
                    workflow = %document.name,
                    failed = ?outcome.failed,
                    "preflight failed; aborting run"
                );
                self.emit(Event::WorkflowCompleted {
                    workflow_name: document.name.clone(),
                    success: false,
                    total_duration_ms: 0,
                    depth: 0,
                    timestamp_ms: now_ms(),
                })
                .await;
                return Ok(WorkflowResult::aborted(&document.name));
            }
        }

        let mut ctx = ExecutionContext::new(&document.name, inputs);
        let skip_through = checkpoint.and_then(|cp| restore_from_checkpoint(document, &cp, &mut ctx));

        Ok(self.execute_steps(document, &mut ctx, 0, skip_through).await)
    }

    /// The step loop shared by top-level runs and sub-workflow
    /// recursion. Emits WorkflowStarted/Completed and drives rollbacks.
    pub(crate) async fn execute_steps(
        &self,
        document: &WorkflowDocument,
        ctx: &mut ExecutionContext,
        depth: usize,
        skip_through: Option<usize>,
    ) -> WorkflowResult {
        let start = Instant::now();
        tracing::info!(workflow = %document.name, depth, "executing workflow");

        self.emit(Event::WorkflowStarted {
            workflow_name: document.name.clone(),
            inputs: ctx
                .inputs()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            depth,
            timestamp_ms: now_ms(),
        })
        .await;

        let mut step_results: Vec<StepResult> = Vec::new();
        let mut success = true;

        for (index, step) in document.steps.iter().enumerate() {
            if let Some(through) = skip_through {
                if index <= through {
                    continue;
                }
            }

            if self.is_cancelled() {
                tracing::warn!(workflow = %document.name, "cancellation observed; no new steps start");
                success = false;
                break;
            }

            if let Some(when) = &step.when {
                match self.check_condition(ctx, when) {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::debug!(step = %step.name, "skipping step (condition=false)");
                        ctx.put_step_output(&step.name, Value::Null, true, 0, step.kind());
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(
                            step = %step.name,
                            error = %e,
                            "condition evaluation failed; skipping step"
                        );
                        ctx.put_step_output(&step.name, Value::Null, true, 0, step.kind());
                        continue;
                    }
                }
            }

            let result = self.run_step_with_events(step, ctx, depth, None).await;
            let failed = !result.success;
            step_results.push(result);

            if failed {
                success = false;
                break;
            }
        }

        let rollback_errors = if success {
            Vec::new()
        } else {
            self.run_rollbacks(ctx).await
        };

        let final_output = step_results
            .iter()
            .rev()
            .find(|r| r.success)
            .map(|r| r.output.clone())
            .unwrap_or(Value::Null);

        let total_duration_ms = start.elapsed().as_millis() as u64;
        self.emit(Event::WorkflowCompleted {
            workflow_name: document.name.clone(),
            success,
            total_duration_ms,
            depth,
            timestamp_ms: now_ms(),
        })
        .await;

        WorkflowResult {
            workflow_name: document.name.clone(),
            success,
            step_results,
            total_duration_ms,
            final_output,
            rollback_errors,
        }
    }

    /// Evaluate a `when` expression to a boolean. Templates resolve
    /// through the expression engine; bare bodies are parsed directly.
    pub(crate) fn check_condition(
        &self,
        ctx: &ExecutionContext,
        when: &str,
    ) -> Result<bool, ExprError> {
        let evaluator = ctx.evaluator();
        let value = if when.contains("${{") {
            evaluator.resolve(when)?
        } else {
            evaluator.eval_str(when.trim())?
        };
        Ok(is_truthy(&value))
    }

    /// Execute registered rollbacks most-recent-first. Each runs
    /// isolated: failures are collected and emitted, never propagated,
    /// and a missing registry entry is a warned no-op.
    async fn run_rollbacks(&self, ctx: &ExecutionContext) -> Vec<RollbackError> {
        let mut errors = Vec::new();

        for (step_name, action_name) in ctx.pending_rollbacks().iter().rev() {
            self.emit(Event::RollbackStarted {
                step_name: step_name.clone(),
                timestamp_ms: now_ms(),
            })
            .await;
            tracing::debug!(step = %step_name, action = %action_name, "executing rollback");

            let error = match self.registry.lookup_action(action_name) {
                Err(_) => {
                    tracing::warn!(
                        step = %step_name,
                        action = %action_name,
                        "rollback action not registered; skipping"
                    );
                    None
                }
                Ok(action) => {
                    let emitter = EventEmitter::new(step_name.clone(), self.event_tx.clone());
                    match action.call(Vec::new(), Map::new(), &emitter).await {
                        Ok(_) => None,
                        Err(e) => {
                            let message = e.to_string();
                            tracing::error!(
                                step = %step_name,
                                error = %message,
                                "rollback failed"
                            );
                            self.emit(Event::RollbackErrorEvent {
                                step_name: step_name.clone(),
                                error: message.clone(),
                                timestamp_ms: now_ms(),
                            })
                            .await;
                            errors.push(RollbackError {
                                step_name: step_name.clone(),
                                error: message.clone(),
                            });
                            Some(message)
                        }
                    }
                }
            };

            self.emit(Event::RollbackCompleted {
                step_name: step_name.clone(),
                success: error.is_none(),
                error,
                timestamp_ms: now_ms(),
            })
            .await;
        }

        errors
    }
}

/// Merge caller inputs with declared defaults, enforcing required
/// inputs and declared types.
pub(crate) fn merge_inputs(
    document: &WorkflowDocument,
    user_inputs: Map<String, Value>,
) -> Result<Map<String, Value>, EngineError> {
    let mut inputs = user_inputs;
    let mut errors = Vec::new();

    for (name, spec) in &document.inputs {
        match inputs.get(name) {
            Some(Value::Null) | None => {
                if let Some(default) = &spec.default {
                    inputs.insert(name.clone(), default.clone());
                } else if spec.required {
                    errors.push(format!("required input '{name}' is missing"));
                } else {
                    inputs.insert(name.clone(), Value::Null);
                }
            }
            Some(value) => {
                if !spec.input_type.matches(value) {
                    errors.push(format!(
                        "input '{name}' does not match its declared type"
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(inputs)
    } else {
        Err(EngineError::InvalidInputs { errors })
    }
}

/// Restore step outputs from a checkpoint and return the index of the
/// checkpoint step to skip through. A checkpoint that no longer matches
/// the document runs from the start.
fn restore_from_checkpoint(
    document: &WorkflowDocument,
    checkpoint: &crate::checkpoint::Checkpoint,
    ctx: &mut ExecutionContext,
) -> Option<usize> {
    let index = document.steps.iter().position(|step| {
        matches!(&step.def, StepDef::Checkpoint { id } if *id == checkpoint.checkpoint_id)
    });

    let Some(index) = index else {
        tracing::warn!(
            workflow = %document.name,
            checkpoint_id = %checkpoint.checkpoint_id,
            "checkpoint does not match any step in the document; running from the beginning"
        );
        return None;
    };

    for result in &checkpoint.step_results {
        ctx.put_step_output(
            &result.name,
            result.output.clone(),
            result.success,
            result.duration_ms,
            result.kind,
        );
    }
    // the checkpoint step's own entry, for later references
    ctx.put_step_output(
        &document.steps[index].name,
        serde_json::json!({ "checkpoint_id": checkpoint.checkpoint_id }),
        true,
        0,
        wl_core::StepKind::Checkpoint,
    );

    tracing::info!(
        workflow = %document.name,
        checkpoint_id = %checkpoint.checkpoint_id,
        restored_steps = checkpoint.step_results.len(),
        "resuming from checkpoint"
    );
    Some(index)
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
