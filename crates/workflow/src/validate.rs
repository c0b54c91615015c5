// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semantic validation against a component registry
//!
//! Checks that every component a document references exists, and that
//! step references inside expressions name an earlier step (sibling
//! references are valid inside branch and parallel scopes). Errors carry
//! structured codes and dotted paths to the offending node.

use crate::schema::{ContextSpec, StepDef, StepRecord, WorkflowDocument};
use serde_json::Value;
use std::collections::HashSet;
use wl_core::Namespace;
use wl_expr::{parse, Expr, RefKind, Segment};

/// Name lookup over the five registry namespaces, implemented by the
/// engine's registry.
pub trait ComponentLookup {
    fn has_component(&self, namespace: Namespace, name: &str) -> bool;
}

/// One finding, error or warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Structured code, e.g. `unknown-action`.
    pub code: String,
    /// Dotted path to the offending node, e.g. `steps[2].action`.
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}: {}", self.code, self.path, self.message)
    }
}

/// Outcome of a semantic validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a document against the registry.
pub fn validate_semantics(
    document: &WorkflowDocument,
    lookup: &dyn ComponentLookup,
) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut known_steps: HashSet<String> = HashSet::new();
    let mut seen_names: HashSet<String> = HashSet::new();

    for (index, step) in document.steps.iter().enumerate() {
        let path = format!("steps[{index}]");
        if !seen_names.insert(step.name.clone()) {
            result.errors.push(ValidationIssue {
                code: "duplicate-step-name".to_string(),
                path: format!("{path}.name"),
                message: format!("step name '{}' is declared more than once", step.name),
            });
        }
        validate_step(step, &path, lookup, &mut known_steps, &mut result);
        known_steps.insert(step.name.clone());
    }

    result
}

fn validate_step(
    step: &StepRecord,
    path: &str,
    lookup: &dyn ComponentLookup,
    known_steps: &mut HashSet<String>,
    result: &mut ValidationResult,
) {
    if let Some(when) = &step.when {
        check_expressions(when, &format!("{path}.when"), known_steps, result);
    }

    if let Some(rollback) = &step.rollback {
        if !lookup.has_component(Namespace::Actions, rollback) {
            // a missing rollback is a warned no-op at execution time
            result.warnings.push(ValidationIssue {
                code: "unknown-rollback".to_string(),
                path: format!("{path}.rollback"),
                message: format!("rollback action '{rollback}' is not registered"),
            });
        }
    }

    match &step.def {
        StepDef::Python {
            action,
            args,
            kwargs,
        } => {
            check_component(
                lookup,
                Namespace::Actions,
                action,
                "unknown-action",
                &format!("{path}.action"),
                result,
            );
            for (i, arg) in args.iter().enumerate() {
                check_value(arg, &format!("{path}.args[{i}]"), known_steps, result);
            }
            for (key, value) in kwargs {
                check_value(value, &format!("{path}.kwargs.{key}"), known_steps, result);
            }
        }
        StepDef::Agent { agent, context } => {
            check_component(
                lookup,
                Namespace::Agents,
                agent,
                "unknown-agent",
                &format!("{path}.agent"),
                result,
            );
            check_context(context, path, lookup, known_steps, result);
        }
        StepDef::Generate { generator, context } => {
            check_component(
                lookup,
                Namespace::Generators,
                generator,
                "unknown-generator",
                &format!("{path}.generator"),
                result,
            );
            check_context(context, path, lookup, known_steps, result);
        }
        StepDef::Validate {
            stages, on_failure, ..
        } => {
            for (i, stage) in stages.iter().enumerate() {
                check_component(
                    lookup,
                    Namespace::Actions,
                    stage,
                    "unknown-stage",
                    &format!("{path}.stages[{i}]"),
                    result,
                );
            }
            if let Some(on_failure) = on_failure {
                validate_step(
                    on_failure,
                    &format!("{path}.on_failure"),
                    lookup,
                    known_steps,
                    result,
                );
            }
        }
        StepDef::Subworkflow { workflow, inputs } => {
            check_component(
                lookup,
                Namespace::Workflows,
                workflow,
                "unknown-workflow",
                &format!("{path}.workflow"),
                result,
            );
            for (key, value) in inputs {
                check_value(value, &format!("{path}.inputs.{key}"), known_steps, result);
            }
        }
        StepDef::Branch { options } => {
            // sibling option steps may reference each other
            let mut scope: HashSet<String> = known_steps.clone();
            for option in options {
                scope.insert(option.step.name.clone());
            }
            for (i, option) in options.iter().enumerate() {
                check_expressions(
                    &option.when,
                    &format!("{path}.options[{i}].when"),
                    &scope,
                    result,
                );
                validate_step(
                    &option.step,
                    &format!("{path}.options[{i}].step"),
                    lookup,
                    &mut scope.clone(),
                    result,
                );
            }
        }
        StepDef::Parallel { steps } => {
            // all siblings are in scope before any child runs
            let mut scope: HashSet<String> = known_steps.clone();
            for child in steps {
                scope.insert(child.name.clone());
            }
            for (i, child) in steps.iter().enumerate() {
                validate_step(
                    child,
                    &format!("{path}.steps[{i}]"),
                    lookup,
                    &mut scope.clone(),
                    result,
                );
            }
        }
        StepDef::Checkpoint { .. } => {}
    }
}

fn check_component(
    lookup: &dyn ComponentLookup,
    namespace: Namespace,
    name: &str,
    code: &str,
    path: &str,
    result: &mut ValidationResult,
) {
    if !lookup.has_component(namespace, name) {
        result.errors.push(ValidationIssue {
            code: code.to_string(),
            path: path.to_string(),
            message: format!("'{name}' is not registered in {namespace}"),
        });
    }
}

fn check_context(
    context: &ContextSpec,
    path: &str,
    lookup: &dyn ComponentLookup,
    known_steps: &HashSet<String>,
    result: &mut ValidationResult,
) {
    match context {
        ContextSpec::Builder(name) => {
            check_component(
                lookup,
                Namespace::ContextBuilders,
                name,
                "unknown-context-builder",
                &format!("{path}.context"),
                result,
            );
        }
        ContextSpec::Literal(map) => {
            for (key, value) in map {
                check_value(value, &format!("{path}.context.{key}"), known_steps, result);
            }
        }
    }
}

/// Walk a JSON value's strings for expressions to check.
fn check_value(
    value: &Value,
    path: &str,
    known_steps: &HashSet<String>,
    result: &mut ValidationResult,
) {
    match value {
        Value::String(text) => check_expressions(text, path, known_steps, result),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_value(item, &format!("{path}[{i}]"), known_steps, result);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                check_value(item, &format!("{path}.{key}"), known_steps, result);
            }
        }
        _ => {}
    }
}

/// Parse every `${{ … }}` in a template and verify step references name
/// a step already in scope.
fn check_expressions(
    text: &str,
    path: &str,
    known_steps: &HashSet<String>,
    result: &mut ValidationResult,
) {
    for body in extract_expression_bodies(text) {
        match parse(&body) {
            Ok(expr) => check_step_refs(&expr, path, known_steps, result),
            Err(err) => {
                result.errors.push(ValidationIssue {
                    code: "expression-syntax".to_string(),
                    path: path.to_string(),
                    message: err.to_string(),
                });
            }
        }
    }
}

fn check_step_refs(
    expr: &Expr,
    path: &str,
    known_steps: &HashSet<String>,
    result: &mut ValidationResult,
) {
    match expr {
        Expr::Ref {
            kind: RefKind::Step,
            path: ref_path,
            ..
        } => {
            if let Some(Segment::Key(step_name)) = ref_path.get(1) {
                if !known_steps.contains(step_name) {
                    result.errors.push(ValidationIssue {
                        code: "unknown-step-reference".to_string(),
                        path: path.to_string(),
                        message: format!(
                            "expression references step '{step_name}' which is not an earlier step"
                        ),
                    });
                }
            }
        }
        Expr::Ref { .. } => {}
        Expr::Bool { operands, .. } => {
            for operand in operands {
                check_step_refs(operand, path, known_steps, result);
            }
        }
        Expr::Ternary {
            condition,
            if_true,
            if_false,
            ..
        } => {
            check_step_refs(condition, path, known_steps, result);
            check_step_refs(if_true, path, known_steps, result);
            check_step_refs(if_false, path, known_steps, result);
        }
    }
}

/// Pull the bodies out of each `${{ … }}` occurrence.
fn extract_expression_bodies(text: &str) -> Vec<String> {
    let mut bodies = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("${{") {
        let after = &rest[start + 3..];
        let Some(end) = after.find("}}") else { break };
        bodies.push(after[..end].to_string());
        rest = &after[end + 2..];
    }
    bodies
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
