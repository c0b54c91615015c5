// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: two python steps thread outputs through expressions.

use crate::prelude::*;
use serde_json::json;
use wl_core::Event;
use wl_engine::ComponentRegistry;
use wl_workflow::parse_workflow;

#[tokio::test]
async fn two_step_workflow_produces_the_combined_output() {
    let document = parse_workflow(
        r#"
version: "1.0"
name: greet
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
"#,
    )
    .unwrap();

    let mut registry = ComponentRegistry::new();
    register_string_actions(&mut registry);

    let (result, events) =
        run_isolated(registry, &document, inputs(&[("name", json!("alice"))])).await;

    let result = result.unwrap();
    assert!(result.success);
    assert_eq!(result.final_output, json!("ALICE!"));
    assert!(result.total_duration_ms >= result.step_results.iter().map(|r| r.duration_ms).max().unwrap_or(0));

    // exactly two successful StepCompleted events, in order
    let completed: Vec<(String, bool)> = events
        .iter()
        .filter_map(|e| match e {
            Event::StepCompleted {
                step_name, success, ..
            } => Some((step_name.clone(), *success)),
            _ => None,
        })
        .collect();
    assert_eq!(
        completed,
        vec![("s1".to_string(), true), ("s2".to_string(), true)]
    );

    // every step result honors the error/success invariant
    for step in &result.step_results {
        assert_eq!(step.success, step.error.is_none());
    }
}

#[tokio::test]
async fn events_arrive_in_the_documented_total_order() {
    let document = parse_workflow(
        r#"
version: "1.0"
name: ordered
steps:
  - name: only
    type: python
    action: uppercase
    kwargs:
      s: x
"#,
    )
    .unwrap();

    let mut registry = ComponentRegistry::new();
    register_string_actions(&mut registry);

    let (result, events) = run_isolated(registry, &document, inputs(&[])).await;
    assert!(result.unwrap().success);

    let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec![
            "validation:started",
            "validation:completed",
            "workflow:started",
            "step:started",
            "step:completed",
            "workflow:completed",
        ]
    );

    // timestamps never go backwards
    let timestamps: Vec<u64> = events.iter().map(|e| e.timestamp_ms()).collect();
    assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
}
