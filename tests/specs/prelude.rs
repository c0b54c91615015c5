// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the behavioral specs

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use wl_core::{Event, WorkflowResult};
use wl_engine::{
    Action, CheckpointStore, ComponentError, ComponentRegistry, EngineError, EventEmitter,
    ExecutorOptions, FileCheckpointStore, WorkflowExecutor,
};
use wl_workflow::WorkflowDocument;

type ActionFn =
    Box<dyn Fn(Vec<Value>, Map<String, Value>) -> Result<Value, ComponentError> + Send + Sync>;

pub struct FnAction {
    f: ActionFn,
}

#[async_trait]
impl Action for FnAction {
    async fn call(
        &self,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
        _emitter: &EventEmitter,
    ) -> Result<Value, ComponentError> {
        (self.f)(args, kwargs)
    }
}

pub fn action<F>(f: F) -> Arc<dyn Action>
where
    F: Fn(Vec<Value>, Map<String, Value>) -> Result<Value, ComponentError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnAction { f: Box::new(f) })
}

/// Action that appends a marker to a shared log and succeeds.
pub fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Action> {
    let log = Arc::clone(log);
    action(move |_, _| {
        log.lock().unwrap().push(name.to_string());
        Ok(Value::Null)
    })
}

/// String helpers used by the happy-path workflows.
pub fn register_string_actions(registry: &mut ComponentRegistry) {
    registry
        .register_action(
            "uppercase",
            action(|_, kwargs| {
                let s = kwargs.get("s").and_then(Value::as_str).unwrap_or_default();
                Ok(json!(s.to_uppercase()))
            }),
        )
        .unwrap();
    registry
        .register_action(
            "concat",
            action(|_, kwargs| {
                let a = kwargs.get("a").and_then(Value::as_str).unwrap_or_default();
                let b = kwargs.get("b").and_then(Value::as_str).unwrap_or_default();
                Ok(json!(format!("{a}{b}")))
            }),
        )
        .unwrap();
}

pub fn inputs(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Run a document and collect the full event stream alongside the
/// result.
pub async fn run_collect(
    registry: ComponentRegistry,
    store: Arc<dyn CheckpointStore>,
    document: &WorkflowDocument,
    run_inputs: Map<String, Value>,
    options: &ExecutorOptions,
) -> (Result<WorkflowResult, EngineError>, Vec<Event>) {
    let (tx, mut rx) = mpsc::channel(1024);
    let collector = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    });

    let executor = WorkflowExecutor::new(Arc::new(registry), tx).with_checkpoint_store(store);
    let result = executor.run(document, run_inputs, options).await;
    drop(executor);
    let events = collector.await.unwrap();
    (result, events)
}

/// Run with a throwaway checkpoint store.
pub async fn run_isolated(
    registry: ComponentRegistry,
    document: &WorkflowDocument,
    run_inputs: Map<String, Value>,
) -> (Result<WorkflowResult, EngineError>, Vec<Event>) {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(dir.path()));
    run_collect(
        registry,
        store,
        document,
        run_inputs,
        &ExecutorOptions::default(),
    )
    .await
}

/// Names of steps that emitted StepStarted, in order.
pub fn started_steps(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::StepStarted { step_name, .. } => Some(step_name.clone()),
            _ => None,
        })
        .collect()
}
