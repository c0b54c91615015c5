// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a failed run resumes from its checkpoint, re-running only
//! the steps after it with restored context.

use crate::prelude::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wl_engine::{
    CheckpointStore, ComponentError, ComponentRegistry, EngineError, ExecutorOptions,
    FileCheckpointStore,
};
use wl_workflow::parse_workflow;

const RESUMABLE: &str = r#"
version: "1.0"
name: resumable
inputs:
  name:
    type: string
    required: true
steps:
  - name: s1
    type: python
    action: uppercase
    kwargs:
      s: "${{ inputs.name }}"
  - name: s2
    type: python
    action: concat
    kwargs:
      a: "${{ steps.s1.output }}"
      b: "!"
  - name: save
    type: checkpoint
    id: after-s2
  - name: s3
    type: python
    action: flaky
    kwargs:
      combined: "${{ steps.s2.output }}"
"#;

fn registry_with_flaky(attempts: &Arc<AtomicUsize>) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    register_string_actions(&mut registry);
    let counter = Arc::clone(attempts);
    registry
        .register_action(
            "flaky",
            action(move |_, kwargs| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ComponentError::new("RuntimeError", "flaky first attempt"))
                } else {
                    Ok(kwargs.get("combined").cloned().unwrap_or(Value::Null))
                }
            }),
        )
        .unwrap();
    registry
}

#[tokio::test]
async fn resume_skips_completed_steps_and_restores_context() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path()));
    let document = parse_workflow(RESUMABLE).unwrap();

    // first run fails in s3, after the checkpoint was written
    let (first, _) = run_collect(
        registry_with_flaky(&attempts),
        Arc::clone(&store),
        &document,
        inputs(&[("name", json!("alice"))]),
        &ExecutorOptions::default(),
    )
    .await;
    assert!(!first.unwrap().success);

    // the resumed run only executes s3, with s1/s2 outputs restored
    let (second, events) = run_collect(
        registry_with_flaky(&attempts),
        Arc::clone(&store),
        &document,
        inputs(&[("name", json!("alice"))]),
        &ExecutorOptions::default(),
    )
    .await;

    let second = second.unwrap();
    assert!(second.success);
    assert_eq!(second.final_output, json!("ALICE!"));
    assert_eq!(started_steps(&events), vec!["s3"]);
}

#[tokio::test]
async fn changed_inputs_abort_the_resume_before_any_step() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path()));
    let document = parse_workflow(RESUMABLE).unwrap();

    let (first, _) = run_collect(
        registry_with_flaky(&attempts),
        Arc::clone(&store),
        &document,
        inputs(&[("name", json!("alice"))]),
        &ExecutorOptions::default(),
    )
    .await;
    assert!(!first.unwrap().success);

    let (second, events) = run_collect(
        registry_with_flaky(&attempts),
        Arc::clone(&store),
        &document,
        inputs(&[("name", json!("bob"))]),
        &ExecutorOptions::default(),
    )
    .await;

    assert!(matches!(second, Err(EngineError::InputMismatch { .. })));
    assert!(started_steps(&events).is_empty());
}
