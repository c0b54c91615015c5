// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expression evaluator and template substitution

use crate::error::{ExprError, ExprEvalError};
use crate::parser::{parse, BoolOp, Expr, RefKind, Segment};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Matches `${{ … }}` occurrences in a template string.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static TEMPLATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\{(.*?)\}\}").expect("constant regex pattern is valid"));

/// Loop iteration state, injected by callers that drive a fan-out over a
/// collection. Absent everywhere else; `item`/`index` references error
/// without it.
#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    pub item: Value,
    pub index: usize,
}

/// Python-style truthiness over JSON values: `null`, `false`, zero, and
/// empty strings/arrays/objects are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Evaluates parsed expressions against a run context.
pub struct Evaluator<'a> {
    inputs: &'a Map<String, Value>,
    steps: &'a Map<String, Value>,
    iteration: Option<&'a Iteration>,
}

impl<'a> Evaluator<'a> {
    pub fn new(inputs: &'a Map<String, Value>, steps: &'a Map<String, Value>) -> Self {
        Self {
            inputs,
            steps,
            iteration: None,
        }
    }

    pub fn with_iteration(mut self, iteration: Option<&'a Iteration>) -> Self {
        self.iteration = iteration;
        self
    }

    /// Evaluate a parsed expression to a JSON value.
    pub fn evaluate(&self, expr: &Expr) -> Result<Value, ExprEvalError> {
        match expr {
            Expr::Bool { op, operands, .. } => self.evaluate_bool(*op, operands),
            Expr::Ternary {
                condition,
                if_true,
                if_false,
                ..
            } => {
                // only the selected branch is evaluated
                if is_truthy(&self.evaluate(condition)?) {
                    self.evaluate(if_true)
                } else {
                    self.evaluate(if_false)
                }
            }
            Expr::Ref {
                kind,
                path,
                negated,
                raw,
            } => {
                let value = self.evaluate_ref(*kind, path, raw)?;
                if *negated {
                    Ok(Value::Bool(!is_truthy(&value)))
                } else {
                    Ok(value)
                }
            }
        }
    }

    /// Parse and evaluate a bare expression body.
    pub fn eval_str(&self, body: &str) -> Result<Value, ExprError> {
        let expr = parse(body)?;
        Ok(self.evaluate(&expr)?)
    }

    /// Substitute every `${{ … }}` occurrence in a template string.
    ///
    /// Identical occurrences are evaluated once. Text without expressions
    /// is returned unchanged.
    pub fn render(&self, text: &str) -> Result<String, ExprError> {
        if text.is_empty() || !TEMPLATE_PATTERN.is_match(text) {
            return Ok(text.to_string());
        }

        let mut replacements: HashMap<String, String> = HashMap::new();
        for captures in TEMPLATE_PATTERN.captures_iter(text) {
            let raw = &captures[0];
            if replacements.contains_key(raw) {
                continue;
            }
            let value = self.eval_str(&captures[1])?;
            replacements.insert(raw.to_string(), display_value(&value));
        }

        let mut result = text.to_string();
        for (raw, replacement) in &replacements {
            result = result.replace(raw.as_str(), replacement);
        }
        Ok(result)
    }

    /// Resolve a template to a typed value: a string that is exactly one
    /// `${{ … }}` expression yields the evaluated value itself, anything
    /// else renders to a string. This keeps `args: ["${{ inputs.count }}"]`
    /// an integer instead of flattening it.
    pub fn resolve(&self, text: &str) -> Result<Value, ExprError> {
        let trimmed = text.trim();
        if let Some(captures) = TEMPLATE_PATTERN.captures(trimmed) {
            if let Some(m) = captures.get(0) {
                if m.start() == 0 && m.end() == trimmed.len() {
                    return self.eval_str(&captures[1]);
                }
            }
        }
        Ok(Value::String(self.render(text)?))
    }

    fn evaluate_bool(&self, op: BoolOp, operands: &[Expr]) -> Result<Value, ExprEvalError> {
        match op {
            // return the first falsy value, or the last value
            BoolOp::And => {
                let mut result = Value::Bool(true);
                for operand in operands {
                    result = self.evaluate(operand)?;
                    if !is_truthy(&result) {
                        return Ok(result);
                    }
                }
                Ok(result)
            }
            // return the first truthy value, or the last value
            BoolOp::Or => {
                let mut result = Value::Null;
                for operand in operands {
                    result = self.evaluate(operand)?;
                    if is_truthy(&result) {
                        return Ok(result);
                    }
                }
                Ok(result)
            }
        }
    }

    fn evaluate_ref(
        &self,
        kind: RefKind,
        path: &[Segment],
        raw: &str,
    ) -> Result<Value, ExprEvalError> {
        match kind {
            RefKind::Input => self.walk_map(self.inputs, "inputs", &path[1..], raw),
            RefKind::Step => self.walk_map(self.steps, "steps", &path[1..], raw),
            RefKind::Item => {
                let Some(iteration) = self.iteration else {
                    return Err(ExprEvalError::new(
                        "Item reference used outside of an iteration context",
                        raw,
                        Vec::new(),
                    ));
                };
                let available = available_keys(&iteration.item, "item");
                walk_value(&iteration.item, "item", &path[1..], raw, &available)
            }
            RefKind::Index => {
                let Some(iteration) = self.iteration else {
                    return Err(ExprEvalError::new(
                        "Index reference used outside of an iteration context",
                        raw,
                        Vec::new(),
                    ));
                };
                Ok(Value::from(iteration.index))
            }
        }
    }

    /// Resolve a reference rooted at one of the two context maps. The
    /// first hop gets the specific not-found wording; the rest is a plain
    /// value walk.
    fn walk_map(
        &self,
        root: &Map<String, Value>,
        root_name: &str,
        segments: &[Segment],
        raw: &str,
    ) -> Result<Value, ExprEvalError> {
        let mut available: Vec<String> =
            root.keys().map(|k| format!("{root_name}.{k}")).collect();
        available.sort();

        let Some((first, rest)) = segments.split_first() else {
            return Ok(Value::Object(root.clone()));
        };

        let key = match first {
            Segment::Key(key) | Segment::QuotedKey(key) => key.clone(),
            Segment::Index(n) => n.to_string(),
        };
        let Some(value) = root.get(&key) else {
            let noun = if root_name == "inputs" { "Input" } else { "Step" };
            return Err(ExprEvalError::new(
                format!("{noun} '{key}' not found"),
                raw,
                available,
            ));
        };

        let mut prefix = format!("{root_name}.{key}");
        walk_segments(value, rest, raw, &available, &mut prefix)
    }
}

/// Walk a value through path segments with a fresh prefix.
fn walk_value(
    root: &Value,
    root_name: &str,
    segments: &[Segment],
    raw: &str,
    available: &[String],
) -> Result<Value, ExprEvalError> {
    let mut prefix = root_name.to_string();
    walk_segments(root, segments, raw, available, &mut prefix)
}

/// Walk the remaining path segments, dispatching on the current value
/// kind at each hop. Only the selected subtree is cloned.
fn walk_segments(
    start: &Value,
    segments: &[Segment],
    raw: &str,
    available: &[String],
    prefix: &mut String,
) -> Result<Value, ExprEvalError> {
    let mut current = start.clone();

    for segment in segments {
        current = match (&current, segment) {
            (Value::Object(map), Segment::Key(key))
            | (Value::Object(map), Segment::QuotedKey(key)) => match map.get(key) {
                Some(value) => value.clone(),
                None => {
                    return Err(ExprEvalError::new(
                        format!("Key '{key}' not found in {prefix}"),
                        raw,
                        available.to_vec(),
                    ))
                }
            },
            (Value::Object(map), Segment::Index(n)) => {
                // integer brackets on an object index by stringified key
                let key = n.to_string();
                match map.get(&key) {
                    Some(value) => value.clone(),
                    None => {
                        return Err(ExprEvalError::new(
                            format!("Key '{key}' not found in {prefix}"),
                            raw,
                            available.to_vec(),
                        ))
                    }
                }
            }
            (Value::Array(items), Segment::Index(n)) => match normalize_index(*n, items.len()) {
                Some(idx) => items[idx].clone(),
                None => {
                    return Err(ExprEvalError::new(
                        format!("List index {n} out of range (length: {})", items.len()),
                        raw,
                        available.to_vec(),
                    ))
                }
            },
            (Value::Array(_), Segment::Key(key)) | (Value::Array(_), Segment::QuotedKey(key)) => {
                return Err(ExprEvalError::new(
                    format!("Cannot access key '{key}' on list (expected integer index)"),
                    raw,
                    available.to_vec(),
                ))
            }
            (Value::String(s), Segment::Index(n)) => {
                let chars: Vec<char> = s.chars().collect();
                match normalize_index(*n, chars.len()) {
                    Some(idx) => Value::String(chars[idx].to_string()),
                    None => {
                        return Err(ExprEvalError::new(
                            format!("String index {n} out of range (length: {})", chars.len()),
                            raw,
                            available.to_vec(),
                        ))
                    }
                }
            }
            (Value::String(_), Segment::Key(key))
            | (Value::String(_), Segment::QuotedKey(key)) => {
                return Err(ExprEvalError::new(
                    format!("Cannot access key '{key}' on string"),
                    raw,
                    available.to_vec(),
                ))
            }
            (other, segment) => {
                let key = segment_display(segment);
                return Err(ExprEvalError::new(
                    format!("Cannot access key '{key}' on {} value", type_name(other)),
                    raw,
                    available.to_vec(),
                ));
            }
        };
        push_prefix(prefix, segment);
    }

    Ok(current)
}

/// Render a value for template substitution: strings bare, everything
/// else in its JSON form.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize_index(n: i64, len: usize) -> Option<usize> {
    let idx = if n < 0 { n + len as i64 } else { n };
    if idx >= 0 && (idx as usize) < len {
        Some(idx as usize)
    } else {
        None
    }
}

fn available_keys(root: &Value, root_name: &str) -> Vec<String> {
    let Value::Object(map) = root else {
        return Vec::new();
    };
    let mut keys: Vec<String> = map.keys().map(|k| format!("{root_name}.{k}")).collect();
    keys.sort();
    keys
}

fn push_prefix(prefix: &mut String, segment: &Segment) {
    match segment {
        Segment::Key(key) => {
            prefix.push('.');
            prefix.push_str(key);
        }
        Segment::Index(n) => {
            prefix.push_str(&format!("[{n}]"));
        }
        Segment::QuotedKey(key) => {
            prefix.push_str(&format!("['{key}']"));
        }
    }
}

fn segment_display(segment: &Segment) -> String {
    match segment {
        Segment::Key(key) | Segment::QuotedKey(key) => key.clone(),
        Segment::Index(n) => n.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod tests;
