// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow input parsing for the CLI

use anyhow::Context;
use serde_json::{Map, Value};
use std::path::Path;

/// Parse `KEY=VALUE` pairs. Values parse as JSON when well-formed
/// (`-i retries=3` is a number, `-i tags='["a"]'` an array), otherwise
/// they stay strings.
pub fn parse_cli_inputs(pairs: &[String]) -> Result<Map<String, Value>, String> {
    let mut inputs = Map::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(format!("invalid input format: {pair}"));
        };
        if key.is_empty() {
            return Err(format!("invalid input format: {pair}"));
        }
        let parsed = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        inputs.insert(key.to_string(), parsed);
    }
    Ok(inputs)
}

/// Load inputs from a JSON or YAML file, by extension.
pub fn load_input_file(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read input file {}", path.display()))?;

    let value: Value = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", path.display()))?
    } else {
        serde_yaml_to_json(&content)
            .with_context(|| format!("invalid YAML in {}", path.display()))?
    };

    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!(
            "input file {} must contain a mapping, got {other}",
            path.display()
        ),
    }
}

fn serde_yaml_to_json(content: &str) -> anyhow::Result<Value> {
    // route YAML through the workflow crate's serde_yaml so the CLI does
    // not carry its own YAML dependency
    Ok(wl_workflow::parser::yaml_to_json(content)?)
}

#[cfg(test)]
#[path = "inputs_tests.rs"]
mod tests;
