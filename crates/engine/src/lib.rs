// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wl-engine: workflow execution
//!
//! The executor drives a parsed [`wl_workflow::WorkflowDocument`] to a
//! terminal [`wl_core::WorkflowResult`]: it evaluates step conditions,
//! resolves `${{ … }}` expressions, dispatches each step kind to its
//! handler, stores outputs in the execution context, persists checkpoint
//! snapshots, runs LIFO rollbacks on failure, and emits the ordered
//! progress-event stream over an mpsc channel.

pub mod actions;
pub mod checkpoint;
pub mod checks;
pub mod component;
pub mod context;
pub mod error;
pub mod executor;
mod handlers;
pub mod preflight;
pub mod registry;

pub use actions::{register_builtin_actions, CommandAction};
pub use checkpoint::{
    input_hash, Checkpoint, CheckpointError, CheckpointStore, FileCheckpointStore,
};
pub use checks::{standard_checks, CommandCheck};
pub use component::{Action, Agent, ComponentError, ContextBuilder, EventEmitter, Generator};
pub use context::ExecutionContext;
pub use error::{EngineError, StepError};
pub use executor::{ExecutorOptions, ResumeMode, WorkflowExecutor};
pub use preflight::PreflightCheck;
pub use registry::{ComponentRegistry, RegistryError};
