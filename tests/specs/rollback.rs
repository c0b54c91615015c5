// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenarios: LIFO rollback ordering, and isolation of a failing
//! rollback.

use crate::prelude::*;
use serde_json::json;
use std::sync::{Arc, Mutex};
use wl_core::Event;
use wl_engine::{ComponentError, ComponentRegistry};
use wl_workflow::parse_workflow;

const COMPENSATING: &str = r#"
version: "1.0"
name: compensating
steps:
  - name: a
    type: python
    action: work
    rollback: rb_a
  - name: b
    type: python
    action: work
    rollback: rb_b
  - name: c
    type: python
    action: work
    rollback: rb_c
  - name: d
    type: python
    action: explode
"#;

fn base_registry(log: &Arc<Mutex<Vec<String>>>) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry
        .register_action("work", action(|_, _| Ok(json!("done"))))
        .unwrap();
    registry
        .register_action(
            "explode",
            action(|_, _| Err(ComponentError::new("RuntimeError", "boom"))),
        )
        .unwrap();
    registry.register_action("rb_a", recorder("rb_a", log)).unwrap();
    registry.register_action("rb_c", recorder("rb_c", log)).unwrap();
    registry
}

#[tokio::test]
async fn rollbacks_execute_most_recent_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = base_registry(&log);
    registry.register_action("rb_b", recorder("rb_b", &log)).unwrap();

    let document = parse_workflow(COMPENSATING).unwrap();
    let (result, events) = run_isolated(registry, &document, inputs(&[])).await;

    let result = result.unwrap();
    assert!(!result.success);
    assert!(result.rollback_errors.is_empty());
    assert_eq!(log.lock().unwrap().clone(), vec!["rb_c", "rb_b", "rb_a"]);

    // three started/completed pairs
    let started = events
        .iter()
        .filter(|e| matches!(e, Event::RollbackStarted { .. }))
        .count();
    let completed = events
        .iter()
        .filter(|e| matches!(e, Event::RollbackCompleted { .. }))
        .count();
    assert_eq!(started, 3);
    assert_eq!(completed, 3);
}

#[tokio::test]
async fn failing_rollback_is_recorded_and_does_not_stop_the_rest() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = base_registry(&log);
    registry
        .register_action(
            "rb_b",
            action(|_, _| Err(ComponentError::new("CleanupError", "cleanup failed"))),
        )
        .unwrap();

    let document = parse_workflow(COMPENSATING).unwrap();
    let (result, events) = run_isolated(registry, &document, inputs(&[])).await;

    let result = result.unwrap();
    assert!(!result.success);

    // the other compensations still ran, in order
    assert_eq!(log.lock().unwrap().clone(), vec!["rb_c", "rb_a"]);

    // the failure is collected, attributed, and does not mask the run
    assert_eq!(result.rollback_errors.len(), 1);
    assert_eq!(result.rollback_errors[0].step_name, "b");
    assert!(result.rollback_errors[0].error.contains("cleanup failed"));

    let error_events = events
        .iter()
        .filter(|e| matches!(e, Event::RollbackErrorEvent { .. }))
        .count();
    assert_eq!(error_events, 1);
}
