// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint persistence
//!
//! One JSON document per `(workflow name, checkpoint id)` under a fixed
//! root (`~/.windlass/checkpoints/<workflow>/<id>.json`). Writes go to a
//! temp file and rename into place so a crash never leaves a torn
//! snapshot. The store is single-writer per workflow name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wl_core::StepResult;

/// Errors from checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("no checkpoint found for workflow '{workflow_name}'")]
    NotFound { workflow_name: String },
}

/// A persisted snapshot of a run up to a checkpoint step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub workflow_name: String,
    pub checkpoint_id: String,
    pub saved_at: DateTime<Utc>,
    /// Hex sha256 over the canonicalized inputs JSON.
    pub input_hash: String,
    /// Step results up to and including the checkpoint step.
    pub step_results: Vec<StepResult>,
}

/// Content-addressable hash of a run's inputs.
///
/// Keys are sorted recursively before hashing so the hash is stable
/// across map orderings.
pub fn input_hash(inputs: &Map<String, Value>) -> String {
    let canonical = canonicalize(&Value::Object(inputs.clone()));
    let serialized = serde_json::to_string(&canonical).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            let mut out = Map::new();
            for (key, value) in sorted {
                out.insert(key.clone(), value);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Checkpoint storage operations.
pub trait CheckpointStore: Send + Sync {
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
    /// Most recently saved checkpoint for the workflow, if any.
    fn load_latest(&self, workflow_name: &str) -> Result<Option<Checkpoint>, CheckpointError>;
    /// Remove every checkpoint for the workflow (explicit restart).
    fn delete_all(&self, workflow_name: &str) -> Result<(), CheckpointError>;
}

/// Filesystem-backed store.
pub struct FileCheckpointStore {
    root: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The default root: `~/.windlass/checkpoints`.
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".windlass")
            .join("checkpoints")
    }

    fn workflow_dir(&self, workflow_name: &str) -> PathBuf {
        self.root.join(workflow_name)
    }

    fn checkpoint_path(&self, workflow_name: &str, checkpoint_id: &str) -> PathBuf {
        self.workflow_dir(workflow_name)
            .join(format!("{checkpoint_id}.json"))
    }
}

impl Default for FileCheckpointStore {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let dir = self.workflow_dir(&checkpoint.workflow_name);
        std::fs::create_dir_all(&dir)?;

        let path = self.checkpoint_path(&checkpoint.workflow_name, &checkpoint.checkpoint_id);
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(checkpoint)?;
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, &path)?;

        tracing::debug!(
            workflow = %checkpoint.workflow_name,
            checkpoint_id = %checkpoint.checkpoint_id,
            path = %path.display(),
            "checkpoint saved"
        );
        Ok(())
    }

    fn load_latest(&self, workflow_name: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let dir = self.workflow_dir(workflow_name);
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut latest: Option<Checkpoint> = None;
        for entry in std::fs::read_dir(&dir)?.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let checkpoint = match read_checkpoint(&path) {
                Ok(checkpoint) => checkpoint,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable checkpoint");
                    continue;
                }
            };
            let newer = latest
                .as_ref()
                .is_none_or(|current| checkpoint.saved_at > current.saved_at);
            if newer {
                latest = Some(checkpoint);
            }
        }
        Ok(latest)
    }

    fn delete_all(&self, workflow_name: &str) -> Result<(), CheckpointError> {
        let dir = self.workflow_dir(workflow_name);
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

fn read_checkpoint(path: &Path) -> Result<Checkpoint, CheckpointError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
