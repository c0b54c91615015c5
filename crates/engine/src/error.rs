// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use crate::checkpoint::CheckpointError;
use crate::component::ComponentError;
use crate::registry::RegistryError;
use thiserror::Error;
use wl_expr::ExprError;

/// Pre-run aborts. Once step execution has begun, failures are carried
/// in the [`wl_core::WorkflowResult`] instead; no errors escape the
/// executor mid-run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid inputs: {}", errors.join("; "))]
    InvalidInputs { errors: Vec<String> },

    #[error(
        "checkpoint inputs do not match: expected hash {expected}, got {actual}; \
         run with --restart to discard the checkpoint"
    )]
    InputMismatch { expected: String, actual: String },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// A step handler failed. The message is what lands in
/// `StepResult.error` and the `step:completed` event; it never carries a
/// stack trace.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StepError {
    pub message: String,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ComponentError> for StepError {
    fn from(err: ComponentError) -> Self {
        StepError::new(err.to_string())
    }
}

impl From<RegistryError> for StepError {
    fn from(err: RegistryError) -> Self {
        StepError::new(err.to_string())
    }
}

impl From<ExprError> for StepError {
    fn from(err: ExprError) -> Self {
        StepError::new(format!("expression error: {err}"))
    }
}
