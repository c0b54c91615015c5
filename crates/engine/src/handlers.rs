// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kind-specific step handlers
//!
//! The executor dispatches by matching on the step's variant tag. Every
//! handler receives expression-resolved values; recursion (branches,
//! parallel children, sub-workflows, validate on_failure) flows back
//! through [`WorkflowExecutor::run_step_with_events`] so nested steps
//! get the same events, context bookkeeping, and rollback registration
//! as top-level ones.

use crate::checkpoint::{input_hash, Checkpoint};
use crate::component::EventEmitter;
use crate::context::ExecutionContext;
use crate::error::StepError;
use crate::executor::{merge_inputs, WorkflowExecutor};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Instant;
use tokio::task::JoinSet;
use wl_core::{now_ms, Event, StepKind, StepResult};
use wl_expr::Evaluator;
use wl_workflow::{ContextSpec, StepDef, StepRecord};

impl WorkflowExecutor {
    /// Run one step with its full event envelope: StepStarted, handler
    /// dispatch, result construction, context write-back, rollback
    /// registration, StepCompleted.
    pub(crate) async fn run_step_with_events(
        &self,
        step: &StepRecord,
        ctx: &mut ExecutionContext,
        depth: usize,
        step_path: Option<String>,
    ) -> StepResult {
        self.emit(Event::StepStarted {
            step_name: step.name.clone(),
            kind: step.kind(),
            step_path: step_path.clone(),
            timestamp_ms: now_ms(),
        })
        .await;

        let start = Instant::now();
        let outcome = self
            .execute_step(step, ctx, depth, step_path.as_deref())
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(output) => StepResult::ok(&step.name, step.kind(), output, duration_ms),
            Err(e) => {
                tracing::error!(step = %step.name, error = %e, "step failed");
                StepResult::failed(&step.name, step.kind(), e.message, duration_ms)
            }
        };

        ctx.put_step_output(
            &step.name,
            result.output.clone(),
            result.success,
            result.duration_ms,
            step.kind(),
        );
        if result.success {
            if let Some(rollback) = &step.rollback {
                ctx.push_rollback(&step.name, rollback);
            }
        }

        self.emit(Event::StepCompleted {
            step_name: step.name.clone(),
            kind: step.kind(),
            success: result.success,
            duration_ms: result.duration_ms,
            error: result.error.clone(),
            step_path,
            timestamp_ms: now_ms(),
        })
        .await;

        result
    }

    /// Dispatch on the step kind. Boxed because branch, parallel,
    /// validate, and sub-workflow steps recurse.
    pub(crate) fn execute_step<'a>(
        &'a self,
        step: &'a StepRecord,
        ctx: &'a mut ExecutionContext,
        depth: usize,
        step_path: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<Value, StepError>> + Send + 'a>> {
        Box::pin(async move {
            match &step.def {
                StepDef::Python {
                    action,
                    args,
                    kwargs,
                } => self.handle_python(step, ctx, action, args, kwargs).await,
                StepDef::Agent { agent, context } => {
                    self.handle_agent(step, ctx, agent, context).await
                }
                StepDef::Generate { generator, context } => {
                    self.handle_generate(step, ctx, generator, context).await
                }
                StepDef::Validate {
                    stages,
                    retry,
                    on_failure,
                } => {
                    self.handle_validate(step, ctx, stages, *retry, on_failure.as_deref(), depth, step_path)
                        .await
                }
                StepDef::Subworkflow { workflow, inputs } => {
                    self.handle_subworkflow(ctx, workflow, inputs, depth).await
                }
                StepDef::Branch { options } => {
                    self.handle_branch(step, ctx, options, depth, step_path).await
                }
                StepDef::Parallel { steps } => {
                    self.handle_parallel(step, ctx, steps, depth, step_path).await
                }
                StepDef::Checkpoint { id } => self.handle_checkpoint(step, ctx, id).await,
            }
        })
    }

    async fn handle_python(
        &self,
        step: &StepRecord,
        ctx: &ExecutionContext,
        action: &str,
        args: &[Value],
        kwargs: &indexmap::IndexMap<String, Value>,
    ) -> Result<Value, StepError> {
        let (resolved_args, resolved_kwargs) = {
            let evaluator = ctx.evaluator();
            let resolved_args = args
                .iter()
                .map(|arg| resolve_value(&evaluator, arg))
                .collect::<Result<Vec<_>, _>>()?;
            let mut resolved_kwargs = Map::new();
            for (key, value) in kwargs {
                resolved_kwargs.insert(key.clone(), resolve_value(&evaluator, value)?);
            }
            (resolved_args, resolved_kwargs)
        };

        let action = self.registry.lookup_action(action)?;
        let emitter = EventEmitter::new(step.name.clone(), self.event_tx.clone());
        Ok(action.call(resolved_args, resolved_kwargs, &emitter).await?)
    }

    async fn handle_agent(
        &self,
        step: &StepRecord,
        ctx: &ExecutionContext,
        agent: &str,
        context: &ContextSpec,
    ) -> Result<Value, StepError> {
        let context_map = self.build_context_map(ctx, context).await?;
        let agent = self.registry.lookup_agent(agent)?;
        let emitter = EventEmitter::new(step.name.clone(), self.event_tx.clone());
        Ok(agent.run(context_map, &emitter).await?)
    }

    async fn handle_generate(
        &self,
        step: &StepRecord,
        ctx: &ExecutionContext,
        generator: &str,
        context: &ContextSpec,
    ) -> Result<Value, StepError> {
        let context_map = self.build_context_map(ctx, context).await?;
        let generator = self.registry.lookup_generator(generator)?;
        let emitter = EventEmitter::new(step.name.clone(), self.event_tx.clone());
        Ok(generator.generate(context_map, &emitter).await?)
    }

    /// Normalize either context shape to a mapping.
    async fn build_context_map(
        &self,
        ctx: &ExecutionContext,
        context: &ContextSpec,
    ) -> Result<Map<String, Value>, StepError> {
        match context {
            ContextSpec::Literal(map) => {
                let evaluator = ctx.evaluator();
                let mut resolved = Map::new();
                for (key, value) in map {
                    resolved.insert(key.clone(), resolve_value(&evaluator, value)?);
                }
                Ok(resolved)
            }
            ContextSpec::Builder(name) => {
                let builder = self.registry.lookup_context_builder(name)?;
                Ok(builder.build(ctx).await?)
            }
        }
    }

    /// Run each named stage, retrying the whole set up to `retry`
    /// times. When retries are exhausted and `on_failure` is declared,
    /// it runs as a nested step; its success repairs state for a later
    /// attempt of the parent workflow but never flips this step's
    /// failure.
    #[allow(clippy::too_many_arguments)]
    async fn handle_validate(
        &self,
        step: &StepRecord,
        ctx: &mut ExecutionContext,
        stages: &[String],
        retry: u32,
        on_failure: Option<&StepRecord>,
        depth: usize,
        step_path: Option<&str>,
    ) -> Result<Value, StepError> {
        let emitter = EventEmitter::new(step.name.clone(), self.event_tx.clone());
        let mut last_error: Option<StepError> = None;

        for attempt in 0..=retry {
            match self.run_stages(stages, &emitter).await {
                Ok(()) => {
                    return Ok(json!({
                        "stages": stages,
                        "attempts": attempt + 1,
                    }));
                }
                Err(e) => {
                    if attempt < retry {
                        tracing::warn!(
                            step = %step.name,
                            attempt = attempt + 1,
                            error = %e,
                            "validation failed; retrying"
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        let error = last_error
            .unwrap_or_else(|| StepError::new("validation failed with no stages to run"));

        if let Some(on_failure) = on_failure {
            let nested_path = child_path(step_path, &step.name, &on_failure.name);
            let nested = self
                .run_step_with_events(on_failure, ctx, depth, Some(nested_path))
                .await;
            tracing::info!(
                step = %step.name,
                on_failure = %on_failure.name,
                repaired = nested.success,
                "on_failure step finished after exhausted retries"
            );
        }

        Err(error)
    }

    async fn run_stages(
        &self,
        stages: &[String],
        emitter: &EventEmitter,
    ) -> Result<(), StepError> {
        for stage in stages {
            let action = self.registry.lookup_action(stage)?;
            action
                .call(Vec::new(), Map::new(), emitter)
                .await
                .map_err(|e| StepError::new(format!("stage '{stage}' failed: {e}")))?;
        }
        Ok(())
    }

    /// Recurse into a registered workflow or fragment with a fresh
    /// context. Nested events stay in the same stream at depth + 1.
    async fn handle_subworkflow(
        &self,
        ctx: &ExecutionContext,
        workflow: &str,
        inputs: &indexmap::IndexMap<String, Value>,
        depth: usize,
    ) -> Result<Value, StepError> {
        let resolved = {
            let evaluator = ctx.evaluator();
            let mut resolved = Map::new();
            for (key, value) in inputs {
                resolved.insert(key.clone(), resolve_value(&evaluator, value)?);
            }
            resolved
        };

        let document = self.registry.lookup_workflow(workflow)?;
        let merged = merge_inputs(&document, resolved)
            .map_err(|e| StepError::new(format!("sub-workflow '{workflow}': {e}")))?;

        let mut sub_ctx = ExecutionContext::new(&document.name, merged);
        let result = self
            .execute_steps(&document, &mut sub_ctx, depth + 1, None)
            .await;

        if result.success {
            Ok(result.final_output)
        } else {
            let cause = result
                .step_results
                .iter()
                .find(|r| !r.success)
                .and_then(|r| r.error.clone())
                .unwrap_or_else(|| "no step ran".to_string());
            Err(StepError::new(format!(
                "sub-workflow '{workflow}' failed: {cause}"
            )))
        }
    }

    /// First option whose condition is truthy runs; none matching is a
    /// no-op with null output. Option condition errors count as false,
    /// like step conditions.
    async fn handle_branch(
        &self,
        step: &StepRecord,
        ctx: &mut ExecutionContext,
        options: &[wl_workflow::BranchOption],
        depth: usize,
        step_path: Option<&str>,
    ) -> Result<Value, StepError> {
        let mut chosen: Option<&wl_workflow::BranchOption> = None;
        for option in options {
            let truthy = match self.check_condition(ctx, &option.when) {
                Ok(truthy) => truthy,
                Err(e) => {
                    tracing::warn!(
                        step = %step.name,
                        condition = %option.when,
                        error = %e,
                        "branch condition failed to evaluate; treating as false"
                    );
                    false
                }
            };
            if truthy {
                chosen = Some(option);
                break;
            }
        }

        let Some(option) = chosen else {
            tracing::debug!(step = %step.name, "no branch option matched");
            return Ok(Value::Null);
        };

        let nested_path = child_path(step_path, &step.name, &option.step.name);
        let result = self
            .run_step_with_events(&option.step, ctx, depth, Some(nested_path))
            .await;

        if result.success {
            Ok(result.output)
        } else {
            Err(StepError::new(result.error.unwrap_or_else(|| {
                format!("branch option '{}' failed", option.step.name)
            })))
        }
    }

    /// Fan out fixed children, each on its own task over a context
    /// snapshot. All children start before any completes; the step
    /// fails iff any child fails, and the others run to natural
    /// completion. Child outputs aggregate in declaration order.
    async fn handle_parallel(
        &self,
        step: &StepRecord,
        ctx: &mut ExecutionContext,
        steps: &[StepRecord],
        depth: usize,
        step_path: Option<&str>,
    ) -> Result<Value, StepError> {
        if steps.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }

        if self.is_cancelled() {
            return Err(StepError::new("cancelled before parallel fan-out"));
        }

        let mut join_set = JoinSet::new();
        for (index, child) in steps.iter().enumerate() {
            let executor = self.clone();
            let child = child.clone();
            let mut child_ctx = ctx.clone();
            let nested_path = child_path(step_path, &step.name, &child.name);
            join_set.spawn(async move {
                let result = executor
                    .run_step_with_events(&child, &mut child_ctx, depth, Some(nested_path))
                    .await;
                (index, result, child_ctx)
            });
        }

        let mut completed: Vec<(usize, StepResult, ExecutionContext)> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(entry) => completed.push(entry),
                Err(e) => {
                    return Err(StepError::new(format!("parallel child task failed: {e}")))
                }
            }
        }
        completed.sort_by_key(|(index, _, _)| *index);

        let mut outputs = Vec::with_capacity(completed.len());
        let mut failures = Vec::new();
        for (_, result, child_ctx) in &completed {
            ctx.absorb_steps(child_ctx);
            outputs.push(result.output.clone());
            if !result.success {
                failures.push(format!(
                    "'{}': {}",
                    result.name,
                    result.error.as_deref().unwrap_or("failed")
                ));
            }
        }

        if failures.is_empty() {
            Ok(Value::Array(outputs))
        } else {
            Err(StepError::new(format!(
                "parallel children failed: {}",
                failures.join("; ")
            )))
        }
    }

    /// Snapshot the run so far under `(workflow name, checkpoint id)`.
    async fn handle_checkpoint(
        &self,
        step: &StepRecord,
        ctx: &ExecutionContext,
        id: &str,
    ) -> Result<Value, StepError> {
        let checkpoint = Checkpoint {
            workflow_name: ctx.workflow_name().to_string(),
            checkpoint_id: id.to_string(),
            saved_at: Utc::now(),
            input_hash: input_hash(ctx.inputs()),
            step_results: results_from_context(ctx),
        };

        self.checkpoint_store
            .save(&checkpoint)
            .map_err(|e| StepError::new(format!("checkpoint save failed: {e}")))?;

        self.emit(Event::CheckpointSaved {
            step_name: step.name.clone(),
            workflow_name: checkpoint.workflow_name.clone(),
            checkpoint_id: checkpoint.checkpoint_id.clone(),
            timestamp_ms: now_ms(),
        })
        .await;

        Ok(json!({ "checkpoint_id": id }))
    }
}

/// Resolve expressions in a JSON value: strings run through the
/// template engine (a string that is exactly one expression keeps its
/// typed value), containers resolve element-wise, scalars pass through.
fn resolve_value(evaluator: &Evaluator<'_>, value: &Value) -> Result<Value, StepError> {
    match value {
        Value::String(text) => Ok(evaluator.resolve(text)?),
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| resolve_value(evaluator, item))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Value::Object(map) => {
            let mut resolved = Map::new();
            for (key, item) in map {
                resolved.insert(key.clone(), resolve_value(evaluator, item)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

/// Rebuild ordered step results from the context's step partition.
fn results_from_context(ctx: &ExecutionContext) -> Vec<StepResult> {
    ctx.steps()
        .iter()
        .map(|(name, state)| StepResult {
            name: name.clone(),
            kind: state
                .get("kind")
                .and_then(Value::as_str)
                .and_then(|s| StepKind::from_str(s).ok())
                .unwrap_or(StepKind::Python),
            success: state.get("success").and_then(Value::as_bool).unwrap_or(true),
            output: state.get("output").cloned().unwrap_or(Value::Null),
            duration_ms: state
                .get("duration_ms")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            error: None,
        })
        .collect()
}

/// Hierarchical event path for nested steps: `parent/child`, extended
/// through deeper nesting.
fn child_path(parent_path: Option<&str>, parent_name: &str, child_name: &str) -> String {
    match parent_path {
        Some(path) => format!("{path}/{child_name}"),
        None => format!("{parent_name}/{child_name}"),
    }
}
