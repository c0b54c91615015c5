// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow document parsing and writing (YAML)

use crate::schema::{StepDef, StepRecord, WorkflowDocument};
use std::collections::HashSet;
use thiserror::Error;

/// Workflow file versions this build accepts.
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Errors that can occur during workflow parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported workflow version '{found}' (supported: {})", supported.join(", "))]
    UnsupportedVersion { found: String, supported: Vec<String> },

    #[error("workflow name must not be empty")]
    EmptyName,

    #[error("workflow must declare at least one step")]
    EmptySteps,

    #[error("duplicate step name '{name}' in {scope}")]
    DuplicateStepName { name: String, scope: String },

    #[error("step in {scope} has an empty name")]
    EmptyStepName { scope: String },

    #[error("input '{name}' declares a default but is required")]
    DefaultOnRequiredInput { name: String },

    #[error("checkpoint step '{name}' has an empty id")]
    EmptyCheckpointId { name: String },
}

impl ParseError {
    /// Stable error code for skipped-file records and journals.
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::Yaml(_) => "yaml-syntax",
            ParseError::UnsupportedVersion { .. } => "unsupported-version",
            ParseError::EmptyName => "empty-name",
            ParseError::EmptySteps => "empty-steps",
            ParseError::DuplicateStepName { .. } => "duplicate-step-name",
            ParseError::EmptyStepName { .. } => "empty-step-name",
            ParseError::DefaultOnRequiredInput { .. } => "default-on-required-input",
            ParseError::EmptyCheckpointId { .. } => "empty-checkpoint-id",
        }
    }
}

/// Parse and structurally validate a workflow document.
///
/// Serde enforces the shape (unknown top-level keys, missing required
/// fields, unknown step types); the checks here cover what the type
/// system cannot: the version set, step-name uniqueness per scope, and
/// input default consistency.
pub fn parse_workflow(content: &str) -> Result<WorkflowDocument, ParseError> {
    let document: WorkflowDocument = serde_yaml::from_str(content)?;

    if !SUPPORTED_VERSIONS.contains(&document.version.as_str()) {
        return Err(ParseError::UnsupportedVersion {
            found: document.version.clone(),
            supported: SUPPORTED_VERSIONS.iter().map(|s| s.to_string()).collect(),
        });
    }

    if document.name.trim().is_empty() {
        return Err(ParseError::EmptyName);
    }

    if document.steps.is_empty() {
        return Err(ParseError::EmptySteps);
    }

    for (name, input) in &document.inputs {
        if input.required && input.default.is_some() {
            return Err(ParseError::DefaultOnRequiredInput { name: name.clone() });
        }
    }

    validate_step_list(&document.steps, "steps")?;

    Ok(document)
}

/// Parse arbitrary YAML into a JSON value. Lets callers accept YAML
/// input files without carrying their own YAML dependency.
pub fn yaml_to_json(content: &str) -> Result<serde_json::Value, ParseError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Write a document back to YAML with deterministic field order.
///
/// Expressions are preserved verbatim; parse → write → parse is the
/// identity under structural equality.
pub fn write_workflow(document: &WorkflowDocument) -> Result<String, ParseError> {
    Ok(serde_yaml::to_string(document)?)
}

/// Check name uniqueness and per-step invariants within one step list.
fn validate_step_list(steps: &[StepRecord], scope: &str) -> Result<(), ParseError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for step in steps {
        if step.name.trim().is_empty() {
            return Err(ParseError::EmptyStepName {
                scope: scope.to_string(),
            });
        }
        if !seen.insert(step.name.as_str()) {
            return Err(ParseError::DuplicateStepName {
                name: step.name.clone(),
                scope: scope.to_string(),
            });
        }
        validate_step(step, scope)?;
    }
    Ok(())
}

fn validate_step(step: &StepRecord, scope: &str) -> Result<(), ParseError> {
    match &step.def {
        StepDef::Checkpoint { id } => {
            if id.trim().is_empty() {
                return Err(ParseError::EmptyCheckpointId {
                    name: step.name.clone(),
                });
            }
        }
        StepDef::Parallel { steps } => {
            validate_step_list(steps, &format!("{scope}.{}", step.name))?;
        }
        StepDef::Branch { options } => {
            for option in options {
                validate_step(&option.step, &format!("{scope}.{}", step.name))?;
            }
        }
        StepDef::Validate {
            on_failure: Some(on_failure),
            ..
        } => {
            validate_step(on_failure, &format!("{scope}.{}", step.name))?;
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
