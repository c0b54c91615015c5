// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI output formatting

use std::process::ExitCode;
use wl_core::{format_elapsed_ms, Event, OutputLevel};

pub fn success() -> ExitCode {
    ExitCode::SUCCESS
}

pub fn failure() -> ExitCode {
    ExitCode::from(1)
}

pub fn usage_error() -> ExitCode {
    ExitCode::from(2)
}

/// A formatted error block with an optional suggestion line.
pub fn format_error(message: &str, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(suggestion) => format!("Error: {message}\n  {suggestion}"),
        None => format!("Error: {message}"),
    }
}

/// Render one progress event as a human-readable line. Returns `None`
/// for events that stay silent in CLI mode.
pub fn render_event(event: &Event) -> Option<String> {
    match event {
        Event::ValidationStarted { workflow_name, .. } => {
            Some(format!("Validating workflow '{workflow_name}'"))
        }
        Event::ValidationCompleted { warnings_count, .. } => {
            if *warnings_count > 0 {
                Some(format!("Validation passed ({warnings_count} warnings)"))
            } else {
                Some("Validation passed".to_string())
            }
        }
        Event::ValidationFailed { errors, .. } => {
            let mut out = String::from("Validation failed:");
            for error in errors {
                out.push_str("\n  - ");
                out.push_str(error);
            }
            Some(out)
        }
        Event::PreflightStarted { prerequisites, .. } => Some(format!(
            "Running preflight checks: {}",
            prerequisites.join(", ")
        )),
        Event::PreflightCheckPassed {
            display_name,
            duration_ms,
            ..
        } => Some(format!(
            "  ok {display_name} ({})",
            format_elapsed_ms(*duration_ms)
        )),
        Event::PreflightCheckFailed {
            display_name,
            message,
            remediation,
            ..
        } => {
            let mut out = format!("  failed {display_name}: {message}");
            if !remediation.is_empty() {
                out.push_str(&format!("\n    {remediation}"));
            }
            Some(out)
        }
        Event::PreflightCompleted {
            success,
            passed_count,
            failed_count,
            ..
        } => Some(if *success {
            format!("Preflight passed ({passed_count} checks)")
        } else {
            format!("Preflight failed ({failed_count} of {} checks)", passed_count + failed_count)
        }),
        Event::WorkflowStarted {
            workflow_name,
            depth,
            ..
        } => Some(format!(
            "{}Running workflow '{workflow_name}'",
            indent(*depth)
        )),
        Event::WorkflowCompleted {
            workflow_name,
            success,
            total_duration_ms,
            depth,
            ..
        } => Some(format!(
            "{}Workflow '{workflow_name}' {} in {}",
            indent(*depth),
            if *success { "completed" } else { "failed" },
            format_elapsed_ms(*total_duration_ms)
        )),
        Event::StepStarted {
            step_name, kind, ..
        } => Some(format!("-> {step_name} ({kind})")),
        Event::StepCompleted {
            step_name,
            success,
            duration_ms,
            error,
            ..
        } => Some(match error {
            Some(error) => format!("x  {step_name}: {error}"),
            None if *success => {
                format!("ok {step_name} ({})", format_elapsed_ms(*duration_ms))
            }
            None => format!("x  {step_name}"),
        }),
        Event::StepOutput { message, level, .. } => Some(match level {
            OutputLevel::Error => format!("   ! {message}"),
            OutputLevel::Warning => format!("   ~ {message}"),
            _ => format!("   | {message}"),
        }),
        Event::AgentStreamChunk { text, .. } => {
            if text.trim().is_empty() {
                None
            } else {
                Some(format!("   | {}", text.trim_end()))
            }
        }
        Event::LoopIterationStarted {
            step_name,
            iteration_index,
            total_iterations,
            item_label,
            ..
        } => Some(format!(
            "-> {step_name} [{}/{total_iterations}] {item_label}",
            iteration_index + 1
        )),
        Event::LoopIterationCompleted {
            step_name,
            iteration_index,
            success,
            ..
        } => Some(format!(
            "{} {step_name} [{}]",
            if *success { "ok" } else { "x " },
            iteration_index + 1
        )),
        Event::CheckpointSaved { checkpoint_id, .. } => {
            Some(format!("Checkpoint saved: {checkpoint_id}"))
        }
        Event::RollbackStarted { step_name, .. } => {
            Some(format!("Rolling back '{step_name}'"))
        }
        Event::RollbackCompleted {
            step_name,
            success,
            error,
            ..
        } => Some(match error {
            Some(error) => format!("x  rollback '{step_name}': {error}"),
            None if *success => format!("ok rollback '{step_name}'"),
            None => format!("x  rollback '{step_name}'"),
        }),
        Event::RollbackErrorEvent { .. } => None,
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
