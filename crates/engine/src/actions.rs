// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builtin actions
//!
//! The engine ships one stock action, `run_command`, so workflows can
//! shell out without a bespoke registration. It drives the subprocess
//! runner in streaming mode and forwards each output line into the
//! run's event stream.

use crate::component::{Action, ComponentError, EventEmitter};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use wl_runner::{CommandRunner, RunOptions, StreamKind};
use wl_core::OutputLevel;

/// Register the builtin actions on a registry.
pub fn register_builtin_actions(
    registry: &mut crate::registry::ComponentRegistry,
) -> Result<(), crate::registry::RegistryError> {
    registry.register_action("run_command", std::sync::Arc::new(CommandAction::default()))
}

/// Runs an external command with the runner's timeout and retry
/// machinery.
///
/// kwargs: `command` (required array of argv strings), `cwd`,
/// `timeout` (seconds), `max_retries`, `retry_delay` (seconds),
/// `scrub_secrets` (bool), `env` (string map), `check` (bool, default
/// true: non-zero exit fails the step).
#[derive(Default)]
pub struct CommandAction {
    runner: CommandRunner,
}

#[async_trait]
impl Action for CommandAction {
    async fn call(
        &self,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
        emitter: &EventEmitter,
    ) -> Result<Value, ComponentError> {
        let argv = parse_argv(&args, &kwargs)?;
        let opts = parse_options(&kwargs)?;
        let check = kwargs
            .get("check")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        // Retried calls go through the buffered path (a retry restarts
        // the whole command); one-shot calls stream line by line.
        let result = if opts.max_retries > 0 {
            self.runner
                .run(&argv, &opts)
                .await
                .map_err(|e| ComponentError::new("CommandError", e.to_string()))?
        } else {
            let mut handle = self
                .runner
                .stream(&argv, &opts)
                .await
                .map_err(|e| ComponentError::new("CommandError", e.to_string()))?;

            while let Some(line) = handle.next_line().await {
                let level = match line.which {
                    StreamKind::Stdout => OutputLevel::Info,
                    StreamKind::Stderr => OutputLevel::Warning,
                };
                emitter.output_from(line.content, level, argv[0].clone()).await;
            }

            let mut result = handle.wait().await;
            if opts.scrub_secrets {
                result.stderr = wl_runner::scrub(&result.stderr);
            }
            result
        };

        if check && !result.success() {
            let reason = if result.timed_out {
                format!("timed out after {}ms", result.duration_ms)
            } else {
                format!("exit code {}", result.returncode)
            };
            return Err(ComponentError::new(
                "CommandFailed",
                format!("{} failed: {reason}", argv[0]),
            ));
        }

        Ok(json!({
            "returncode": result.returncode,
            "stdout": result.stdout,
            "stderr": result.stderr,
            "duration_ms": result.duration_ms,
            "timed_out": result.timed_out,
        }))
    }
}

/// The argv comes from the `command` kwarg or, failing that, the
/// positional args.
fn parse_argv(args: &[Value], kwargs: &Map<String, Value>) -> Result<Vec<String>, ComponentError> {
    let source: Vec<Value> = match kwargs.get("command") {
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            return Err(ComponentError::new(
                "InvalidArguments",
                format!("'command' must be an array of strings, got {other}"),
            ))
        }
        None => args.to_vec(),
    };

    let argv: Vec<String> = source
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    if argv.is_empty() || argv.len() != source.len() {
        return Err(ComponentError::new(
            "InvalidArguments",
            "run_command needs a non-empty argv of strings",
        ));
    }
    Ok(argv)
}

fn parse_options(kwargs: &Map<String, Value>) -> Result<RunOptions, ComponentError> {
    let mut opts = RunOptions {
        cwd: kwargs
            .get("cwd")
            .and_then(Value::as_str)
            .map(PathBuf::from),
        timeout: kwargs
            .get("timeout")
            .and_then(Value::as_f64)
            .map(Duration::from_secs_f64),
        max_retries: kwargs
            .get("max_retries")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
        retry_delay: kwargs
            .get("retry_delay")
            .and_then(Value::as_f64)
            .map(Duration::from_secs_f64)
            .unwrap_or(Duration::from_secs(1)),
        scrub_secrets: kwargs
            .get("scrub_secrets")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        env: HashMap::new(),
    };

    if let Some(Value::Object(env)) = kwargs.get("env") {
        for (key, value) in env {
            let Some(value) = value.as_str() else {
                return Err(ComponentError::new(
                    "InvalidArguments",
                    format!("env value for '{key}' must be a string"),
                ));
            };
            opts.env.insert(key.clone(), value.to_string());
        }
    }

    Ok(opts)
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
