// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution result types

use serde::{Deserialize, Serialize};

/// Terminal result of one command invocation (after any retries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit code. `127` command not found, `126` permission denied,
    /// `-1` killed (timeout or signal).
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl CommandResult {
    /// A clean zero exit that did not time out.
    pub fn success(&self) -> bool {
        self.returncode == 0 && !self.timed_out
    }
}

/// Which stream a line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One line of merged streaming output.
///
/// `timestamp_ms` is elapsed milliseconds since the process was spawned,
/// measured monotonically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamLine {
    pub content: String,
    pub which: StreamKind,
    pub timestamp_ms: u64,
}
