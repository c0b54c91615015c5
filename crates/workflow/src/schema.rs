// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow document schema
//!
//! Step kinds are a sum type: each variant carries only its own fields
//! and the executor dispatches on the variant tag. Expression-bearing
//! fields hold raw template strings; nothing is evaluated at parse time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wl_core::StepKind;

/// A workflow document loaded from YAML.
///
/// Serialized field order is the writer contract: version, name,
/// description, inputs, steps, preflight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowDocument {
    pub version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, InputSpec>,
    pub steps: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preflight: Vec<String>,
}

impl WorkflowDocument {
    pub fn get_step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Declared workflow input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSpec {
    #[serde(rename = "type")]
    pub input_type: InputType,
    /// Inputs are optional unless declared required.
    #[serde(default)]
    pub required: bool,
    /// Only valid when `required` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl InputType {
    /// Whether a JSON value conforms to this declared type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            InputType::String => value.is_string(),
            InputType::Integer => value.is_i64() || value.is_u64(),
            InputType::Number => value.is_number(),
            InputType::Boolean => value.is_boolean(),
            InputType::Array => value.is_array(),
            InputType::Object => value.is_object(),
        }
    }
}

/// One step of a workflow.
///
/// Writer field order: name, type (from the flattened kind), the kind's
/// own fields, when, rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    #[serde(flatten)]
    pub def: StepDef,
    /// Condition expression; absent means "run".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    /// Name of a registered rollback action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<String>,
}

impl StepRecord {
    pub fn kind(&self) -> StepKind {
        self.def.kind()
    }
}

/// Per-kind step payloads, tagged by `type` in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepDef {
    /// Invoke a registered action with expression-resolved args/kwargs.
    Python {
        action: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<Value>,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        kwargs: IndexMap<String, Value>,
    },
    /// Invoke a registered agent with a context map.
    Agent {
        agent: String,
        #[serde(default)]
        context: ContextSpec,
    },
    /// Invoke a registered generator with a context map.
    Generate {
        generator: String,
        #[serde(default)]
        context: ContextSpec,
    },
    /// Run named validation stages with bounded retry.
    Validate {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        stages: Vec<String>,
        #[serde(default)]
        retry: u32,
        /// Nested step executed if validation still fails after retries.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_failure: Option<Box<StepRecord>>,
    },
    /// Run a registered workflow or fragment with its own inputs.
    Subworkflow {
        workflow: String,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        inputs: IndexMap<String, Value>,
    },
    /// First option whose condition is truthy runs; none matching is a
    /// no-op with null output.
    Branch { options: Vec<BranchOption> },
    /// Fixed children executed concurrently.
    Parallel { steps: Vec<StepRecord> },
    /// Persist a context snapshot under this id.
    Checkpoint { id: String },
}

impl StepDef {
    pub fn kind(&self) -> StepKind {
        match self {
            StepDef::Python { .. } => StepKind::Python,
            StepDef::Agent { .. } => StepKind::Agent,
            StepDef::Generate { .. } => StepKind::Generate,
            StepDef::Validate { .. } => StepKind::Validate,
            StepDef::Subworkflow { .. } => StepKind::Subworkflow,
            StepDef::Branch { .. } => StepKind::Branch,
            StepDef::Parallel { .. } => StepKind::Parallel,
            StepDef::Checkpoint { .. } => StepKind::Checkpoint,
        }
    }
}

/// A branch option: the first truthy `when` selects its step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchOption {
    pub when: String,
    pub step: Box<StepRecord>,
}

/// Context for agent and generate steps: either a literal mapping of
/// expressions, or the name of a registered context builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextSpec {
    Builder(String),
    Literal(IndexMap<String, Value>),
}

impl Default for ContextSpec {
    fn default() -> Self {
        ContextSpec::Literal(IndexMap::new())
    }
}

impl ContextSpec {
    pub fn is_empty_literal(&self) -> bool {
        matches!(self, ContextSpec::Literal(map) if map.is_empty())
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
