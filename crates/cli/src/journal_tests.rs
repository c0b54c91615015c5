// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use wl_core::StepKind;

#[test]
fn journal_has_header_events_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");

    let mut inputs = Map::new();
    inputs.insert("branch".to_string(), json!("main"));

    let mut journal = SessionJournal::create(&path, "deploy", &inputs).unwrap();
    journal
        .write_event(&Event::StepStarted {
            step_name: "build".into(),
            kind: StepKind::Python,
            step_path: None,
            timestamp_ms: 10,
        })
        .unwrap();
    journal
        .write_event(&Event::StepCompleted {
            step_name: "build".into(),
            kind: StepKind::Python,
            success: true,
            duration_ms: 42,
            error: None,
            step_path: None,
            timestamp_ms: 52,
        })
        .unwrap();
    journal.finish(true, 52).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["workflow"], "deploy");
    assert_eq!(lines[0]["inputs"]["branch"], "main");
    assert_eq!(lines[1]["event"], "step:started");
    assert_eq!(lines[2]["event"], "step:completed");
    assert_eq!(lines[2]["duration_ms"], 42);
    assert_eq!(lines[3]["success"], true);
    assert_eq!(lines[3]["total_duration_ms"], 52);
}

#[test]
fn journal_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("logs").join("run.jsonl");
    let journal = SessionJournal::create(&path, "deploy", &Map::new()).unwrap();
    journal.finish(false, 0).unwrap();
    assert!(path.is_file());
}
