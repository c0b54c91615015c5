// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session journal
//!
//! One JSON object per line: a header with the workflow name and
//! inputs, every progress event, and a closing summary.

use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use wl_core::Event;

pub struct SessionJournal {
    writer: BufWriter<File>,
}

impl SessionJournal {
    /// Create the journal file and write the header line.
    pub fn create(
        path: &Path,
        workflow_name: &str,
        inputs: &Map<String, Value>,
    ) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut journal = Self {
            writer: BufWriter::new(File::create(path)?),
        };
        journal.write_line(&json!({
            "workflow": workflow_name,
            "inputs": inputs,
        }))?;
        Ok(journal)
    }

    pub fn write_event(&mut self, event: &Event) -> std::io::Result<()> {
        let line = serde_json::to_value(event)?;
        self.write_line(&line)
    }

    /// Write the summary and flush. Consumes the journal.
    pub fn finish(mut self, success: bool, total_duration_ms: u64) -> std::io::Result<()> {
        self.write_line(&json!({
            "success": success,
            "total_duration_ms": total_duration_ms,
        }))?;
        self.writer.flush()
    }

    fn write_line(&mut self, value: &Value) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer.write_all(b"\n")
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
