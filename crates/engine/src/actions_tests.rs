// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::component::Action;
use serde_json::json;
use tokio::sync::mpsc;
use wl_core::Event;

fn kwargs(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

async fn call(
    kwargs: Map<String, Value>,
) -> (Result<Value, ComponentError>, Vec<Event>) {
    let (tx, mut rx) = mpsc::channel(256);
    let emitter = EventEmitter::new("cmd", tx);
    let action = CommandAction::default();
    let result = action.call(Vec::new(), kwargs, &emitter).await;
    drop(emitter);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (result, events)
}

#[tokio::test]
async fn runs_a_command_and_captures_output() {
    let (result, events) = call(kwargs(&[(
        "command",
        json!(["sh", "-c", "echo line-one; echo line-two"]),
    )]))
    .await;

    let output = result.unwrap();
    assert_eq!(output["returncode"], 0);
    assert_eq!(output["stdout"], "line-one\nline-two");

    let lines: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            Event::StepOutput { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(lines, vec!["line-one", "line-two"]);
}

#[tokio::test]
async fn non_zero_exit_fails_the_step_by_default() {
    let (result, _) = call(kwargs(&[("command", json!(["sh", "-c", "exit 3"]))])).await;
    let err = result.unwrap_err();
    assert_eq!(err.kind, "CommandFailed");
    assert!(err.message.contains("exit code 3"));
}

#[tokio::test]
async fn check_false_reports_the_exit_code_instead() {
    let (result, _) = call(kwargs(&[
        ("command", json!(["sh", "-c", "exit 3"])),
        ("check", json!(false)),
    ]))
    .await;
    assert_eq!(result.unwrap()["returncode"], 3);
}

#[tokio::test]
async fn missing_command_is_an_argument_error() {
    let (result, _) = call(kwargs(&[])).await;
    assert_eq!(result.unwrap_err().kind, "InvalidArguments");
}

#[tokio::test]
async fn non_string_argv_entries_are_rejected() {
    let (result, _) = call(kwargs(&[("command", json!(["echo", 42]))])).await;
    assert_eq!(result.unwrap_err().kind, "InvalidArguments");
}

#[tokio::test]
async fn env_overlay_is_passed_through() {
    let (result, _) = call(kwargs(&[
        ("command", json!(["sh", "-c", "printf %s \"$WL_ACTION_VAR\""])),
        ("env", json!({"WL_ACTION_VAR": "present"})),
    ]))
    .await;
    assert_eq!(result.unwrap()["stdout"], "present");
}

#[tokio::test]
async fn register_builtin_actions_installs_run_command() {
    let mut registry = crate::registry::ComponentRegistry::new();
    register_builtin_actions(&mut registry).unwrap();
    assert!(registry.lookup_action("run_command").is_ok());
}
