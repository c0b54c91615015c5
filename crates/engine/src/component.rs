// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component traits and the event emitter handed to them
//!
//! The engine knows nothing about what an action or agent does, only
//! that it can be called with resolved values and returns a
//! JSON-serializable output or a typed error.

use crate::context::ExecutionContext;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use wl_core::{now_ms, ChunkType, Event, OutputLevel};

/// A component invocation failed.
///
/// `kind` is a short classifier (the component's own error type name or
/// a category like `io`); it is folded into the step error as
/// `kind: message` so events never carry stack traces.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ComponentError {
    pub kind: String,
    pub message: String,
}

impl ComponentError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Lets a component contribute to the run's event stream while it
/// executes: informational output lines and streaming agent chunks.
#[derive(Clone)]
pub struct EventEmitter {
    step_name: String,
    tx: mpsc::Sender<Event>,
}

impl EventEmitter {
    pub(crate) fn new(step_name: impl Into<String>, tx: mpsc::Sender<Event>) -> Self {
        Self {
            step_name: step_name.into(),
            tx,
        }
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Emit an informational output line for this step.
    pub async fn output(&self, message: impl Into<String>, level: OutputLevel) {
        let event = Event::StepOutput {
            step_name: self.step_name.clone(),
            message: message.into(),
            level,
            source: None,
            timestamp_ms: now_ms(),
        };
        let _ = self.tx.send(event).await;
    }

    /// Emit an informational output line with a source tag (`git`,
    /// `github`, a stage name).
    pub async fn output_from(
        &self,
        message: impl Into<String>,
        level: OutputLevel,
        source: impl Into<String>,
    ) {
        let event = Event::StepOutput {
            step_name: self.step_name.clone(),
            message: message.into(),
            level,
            source: Some(source.into()),
            timestamp_ms: now_ms(),
        };
        let _ = self.tx.send(event).await;
    }

    /// Emit a streaming text chunk from an agent.
    pub async fn chunk(
        &self,
        agent_name: impl Into<String>,
        text: impl Into<String>,
        chunk_type: ChunkType,
    ) {
        let event = Event::AgentStreamChunk {
            step_name: self.step_name.clone(),
            agent_name: agent_name.into(),
            text: text.into(),
            chunk_type,
            timestamp_ms: now_ms(),
        };
        let _ = self.tx.send(event).await;
    }
}

/// A named callable invoked by `python`-kind steps (and rollbacks and
/// validation stages).
#[async_trait]
pub trait Action: Send + Sync {
    async fn call(
        &self,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
        emitter: &EventEmitter,
    ) -> Result<Value, ComponentError>;
}

impl std::fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Action")
    }
}

/// An LLM-backed computation: takes a context map, may stream chunks,
/// returns a structured output.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn run(
        &self,
        context: Map<String, Value>,
        emitter: &EventEmitter,
    ) -> Result<Value, ComponentError>;
}

/// A text generator invoked by `generate`-kind steps.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        context: Map<String, Value>,
        emitter: &EventEmitter,
    ) -> Result<Value, ComponentError>;
}

/// Produces a context map for agent/generate steps from the run state.
/// The static-mapping shape is handled by the schema; this is the
/// callable shape, and it may suspend.
#[async_trait]
pub trait ContextBuilder: Send + Sync {
    async fn build(&self, context: &ExecutionContext) -> Result<Map<String, Value>, ComponentError>;
}
