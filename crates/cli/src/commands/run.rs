// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wl run`: execute a workflow

use crate::inputs::{load_input_file, parse_cli_inputs};
use crate::journal::SessionJournal;
use crate::output::{self, format_error, render_event};
use clap::Args;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use wl_engine::{
    register_builtin_actions, standard_checks, ComponentRegistry, EngineError, ExecutorOptions,
    ResumeMode, WorkflowExecutor,
};
use wl_workflow::{discover, parse_workflow, DiscoveryLocations, WorkflowDocument};

#[derive(Args)]
pub struct RunArgs {
    /// Workflow name (from discovery) or path to a workflow file
    pub name_or_path: String,

    /// Workflow input as KEY=VALUE; values parse as JSON when well-formed
    #[arg(short = 'i', long = "input", value_name = "KEY=VALUE")]
    pub inputs: Vec<String>,

    /// Read inputs from a JSON or YAML file (CLI inputs override it)
    #[arg(long = "input-file", value_name = "FILE")]
    pub input_file: Option<PathBuf>,

    /// Show the execution plan without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Delete checkpoints and run from the beginning
    #[arg(long)]
    pub restart: bool,

    /// Skip semantic validation
    #[arg(long)]
    pub no_validate: bool,

    /// List the workflow's steps and exit
    #[arg(long)]
    pub list_steps: bool,

    /// Run only this step, by name or 1-based index
    #[arg(long = "step", value_name = "NAME_OR_INDEX")]
    pub step: Option<String>,

    /// Write a session journal (header, events, summary) to this file
    #[arg(long = "session-log", value_name = "PATH")]
    pub session_log: Option<PathBuf>,
}

pub async fn execute(args: RunArgs) -> ExitCode {
    let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let locations = DiscoveryLocations::standard(&project_root);
    let discovery = discover(&locations);

    // a path on disk wins over a discovered name
    let document = {
        let path = Path::new(&args.name_or_path);
        if path.is_file() {
            match std::fs::read_to_string(path).map_err(anyhow::Error::from).and_then(|content| {
                parse_workflow(&content).map_err(anyhow::Error::from)
            }) {
                Ok(document) => document,
                Err(e) => {
                    eprintln!("{}", format_error(
                        &format!("cannot load workflow file {}: {e}", path.display()),
                        None,
                    ));
                    return output::usage_error();
                }
            }
        } else {
            match discovery.get_workflow(&args.name_or_path) {
                Some(found) => found.workflow.clone(),
                None => {
                    eprintln!(
                        "{}",
                        format_error(
                            &format!("Workflow '{}' not found", args.name_or_path),
                            Some(&available_suggestion(&discovery)),
                        )
                    );
                    return output::usage_error();
                }
            }
        }
    };

    let mut inputs: Map<String, Value> = match &args.input_file {
        Some(path) => match load_input_file(path) {
            Ok(inputs) => inputs,
            Err(e) => {
                eprintln!("{}", format_error(&e.to_string(), None));
                return output::usage_error();
            }
        },
        None => Map::new(),
    };
    match parse_cli_inputs(&args.inputs) {
        Ok(cli_inputs) => inputs.extend(cli_inputs),
        Err(message) => {
            eprintln!(
                "{}",
                format_error(&message, Some("Use KEY=VALUE format (e.g. -i branch=main)"))
            );
            return output::usage_error();
        }
    }

    if args.list_steps {
        print_steps(&document);
        return output::success();
    }

    let document = match narrow_to_step(document, args.step.as_deref()) {
        Ok(document) => document,
        Err(message) => {
            eprintln!("{}", format_error(&message, Some("Use --list-steps to see step names")));
            return output::usage_error();
        }
    };

    if args.dry_run {
        print_plan(&document, &inputs);
        return output::success();
    }

    let mut registry = ComponentRegistry::new();
    if let Err(e) = register_builtin_actions(&mut registry) {
        eprintln!("{}", format_error(&e.to_string(), None));
        return output::failure();
    }
    for discovered in discovery.workflows.iter().chain(discovery.fragments.iter()) {
        if discovered.workflow.name == document.name {
            continue;
        }
        if let Err(e) = registry.register_workflow(discovered.workflow.clone()) {
            tracing::warn!(error = %e, "skipping duplicate workflow registration");
        }
    }

    let journal = match &args.session_log {
        Some(path) => match SessionJournal::create(path, &document.name, &inputs) {
            Ok(journal) => Some(journal),
            Err(e) => {
                eprintln!(
                    "{}",
                    format_error(&format!("cannot open session log: {e}"), None)
                );
                return output::failure();
            }
        },
        None => None,
    };

    let (tx, mut rx) = mpsc::channel(256);
    let printer = tokio::spawn(async move {
        let mut journal = journal;
        while let Some(event) = rx.recv().await {
            if let Some(line) = render_event(&event) {
                println!("{line}");
            }
            if let Some(journal) = journal.as_mut() {
                if let Err(e) = journal.write_event(&event) {
                    tracing::warn!(error = %e, "failed to write session log entry");
                }
            }
        }
        journal
    });

    let executor =
        WorkflowExecutor::new(Arc::new(registry), tx).with_preflight_checks(standard_checks());
    let options = ExecutorOptions {
        // running a single step out of context would trip the
        // earlier-step reference checks
        validate: !args.no_validate && args.step.is_none(),
        resume: if args.restart {
            ResumeMode::Restart
        } else {
            ResumeMode::Auto
        },
    };

    let outcome = executor.run(&document, inputs, &options).await;
    drop(executor);
    let journal = printer.await.ok().flatten();

    match outcome {
        Ok(result) => {
            if let Some(journal) = journal {
                if let Err(e) = journal.finish(result.success, result.total_duration_ms) {
                    tracing::warn!(error = %e, "failed to finalize session log");
                }
            }
            if result.success {
                output::success()
            } else {
                if let Some(failed) = result.step_results.iter().find(|r| !r.success) {
                    eprintln!(
                        "{}",
                        format_error(
                            &format!(
                                "Step '{}' failed: {}",
                                failed.name,
                                failed.error.as_deref().unwrap_or("unknown error")
                            ),
                            Some("Check the step configuration"),
                        )
                    );
                }
                output::failure()
            }
        }
        Err(e) => {
            if let Some(journal) = journal {
                let _ = journal.finish(false, 0);
            }
            eprintln!("{}", format_error(&e.to_string(), None));
            match e {
                EngineError::InvalidInputs { .. } => output::usage_error(),
                _ => output::failure(),
            }
        }
    }
}

fn available_suggestion(discovery: &wl_workflow::DiscoveryResult) -> String {
    let available = discovery.workflow_names();
    if available.is_empty() {
        return "No workflows discovered. Check your workflow directories.".to_string();
    }
    let mut shown = available
        .iter()
        .take(5)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    if available.len() > 5 {
        shown.push_str(&format!(", ... ({} total)", available.len()));
    }
    format!("Available workflows: {shown}")
}

fn print_steps(document: &WorkflowDocument) {
    println!("Workflow: {}", document.name);
    println!("Version: {}", document.version);
    if let Some(description) = &document.description {
        println!("Description: {description}");
    }
    println!();
    println!("Steps:");
    for (i, step) in document.steps.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, step.name, step.kind());
        if let Some(when) = &step.when {
            println!("     when: {when}");
        }
    }
    println!();
    println!("Use --step <name|number> to run only a specific step.");
}

fn print_plan(document: &WorkflowDocument, inputs: &Map<String, Value>) {
    println!("Dry run: workflow '{}'", document.name);
    if !inputs.is_empty() {
        println!("Inputs:");
        for (key, value) in inputs {
            println!("  {key} = {value}");
        }
    }
    println!("Would execute:");
    for (i, step) in document.steps.iter().enumerate() {
        match &step.when {
            Some(when) => println!("  {}. {} ({}) when {when}", i + 1, step.name, step.kind()),
            None => println!("  {}. {} ({})", i + 1, step.name, step.kind()),
        }
    }
}

/// Narrow the document to a single step selected by name or 1-based
/// index.
fn narrow_to_step(
    document: WorkflowDocument,
    selector: Option<&str>,
) -> Result<WorkflowDocument, String> {
    let Some(selector) = selector else {
        return Ok(document);
    };

    let index = match selector.parse::<usize>() {
        Ok(n) if n >= 1 && n <= document.steps.len() => n - 1,
        Ok(n) => {
            return Err(format!(
                "step index {n} is out of range (1..{})",
                document.steps.len()
            ))
        }
        Err(_) => match document.steps.iter().position(|s| s.name == selector) {
            Some(index) => index,
            None => return Err(format!("no step named '{selector}'")),
        },
    };

    let mut narrowed = document;
    narrowed.steps = vec![narrowed.steps[index].clone()];
    Ok(narrowed)
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
