// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preflight prerequisite checks
//!
//! Named checks run before any step executes, in dependency-respecting
//! waves: every check whose dependencies have passed runs concurrently
//! with the rest of its wave, under a per-check timeout. A failed
//! dependency skips its dependents.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use wl_core::{now_ms, Event};

/// Per-check deadline.
pub(crate) const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// One prerequisite check (tool availability, auth, repository state).
#[async_trait]
pub trait PreflightCheck: Send + Sync {
    /// Stable name referenced from workflow `preflight` lists.
    fn name(&self) -> &str;

    /// Human-readable name for progress output.
    fn display_name(&self) -> &str {
        self.name()
    }

    /// Names of checks that must pass before this one runs.
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// User-facing instructions shown when the check fails.
    fn remediation(&self) -> String {
        String::new()
    }

    /// Run the check. `Ok` carries a success message, `Err` the failure.
    async fn run(&self) -> Result<String, String>;
}

/// Outcome of a full preflight pass.
#[derive(Debug, Clone, Default)]
pub(crate) struct PreflightOutcome {
    pub passed: Vec<String>,
    pub failed: Vec<String>,
}

impl PreflightOutcome {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run the named checks, emitting per-check events.
///
/// Unknown names fail their check rather than aborting the pass, so a
/// typo in a workflow's preflight list reads like any other failed
/// prerequisite.
pub(crate) async fn run_preflight(
    registered: &BTreeMap<String, Arc<dyn PreflightCheck>>,
    requested: &[String],
    tx: &mpsc::Sender<Event>,
) -> PreflightOutcome {
    let start = Instant::now();
    let _ = tx
        .send(Event::PreflightStarted {
            prerequisites: requested.to_vec(),
            timestamp_ms: now_ms(),
        })
        .await;

    let mut outcome = PreflightOutcome::default();
    let mut remaining: Vec<Arc<dyn PreflightCheck>> = Vec::new();

    for name in requested {
        match registered.get(name) {
            Some(check) => remaining.push(Arc::clone(check)),
            None => {
                let _ = tx
                    .send(Event::PreflightCheckFailed {
                        name: name.clone(),
                        display_name: name.clone(),
                        duration_ms: 0,
                        message: format!("preflight check '{name}' is not registered"),
                        remediation: String::new(),
                        affected_steps: Vec::new(),
                        timestamp_ms: now_ms(),
                    })
                    .await;
                outcome.failed.push(name.clone());
            }
        }
    }

    let mut passed: HashSet<String> = HashSet::new();

    while !remaining.is_empty() {
        // Ready wave: all dependencies already passed.
        let (wave, rest): (Vec<_>, Vec<_>) = remaining.into_iter().partition(|check| {
            check
                .depends_on()
                .iter()
                .all(|dep| passed.contains(dep.as_str()))
        });
        remaining = rest;

        if wave.is_empty() {
            // Everything left depends on something failed or absent.
            for check in remaining.drain(..) {
                let blocker = check
                    .depends_on()
                    .into_iter()
                    .find(|dep| !passed.contains(dep.as_str()))
                    .unwrap_or_default();
                let _ = tx
                    .send(Event::PreflightCheckFailed {
                        name: check.name().to_string(),
                        display_name: check.display_name().to_string(),
                        duration_ms: 0,
                        message: format!("skipped because {blocker} failed"),
                        remediation: check.remediation(),
                        affected_steps: Vec::new(),
                        timestamp_ms: now_ms(),
                    })
                    .await;
                outcome.failed.push(check.name().to_string());
            }
            break;
        }

        let mut join_set = JoinSet::new();
        for check in wave {
            join_set.spawn(async move {
                let check_start = Instant::now();
                let result =
                    match tokio::time::timeout(CHECK_TIMEOUT, check.run()).await {
                        Ok(result) => result,
                        Err(_) => Err(format!(
                            "timed out after {}s",
                            CHECK_TIMEOUT.as_secs()
                        )),
                    };
                (check, result, check_start.elapsed().as_millis() as u64)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let Ok((check, result, duration_ms)) = joined else {
                continue;
            };
            match result {
                Ok(message) => {
                    let _ = tx
                        .send(Event::PreflightCheckPassed {
                            name: check.name().to_string(),
                            display_name: check.display_name().to_string(),
                            duration_ms,
                            message,
                            timestamp_ms: now_ms(),
                        })
                        .await;
                    passed.insert(check.name().to_string());
                    outcome.passed.push(check.name().to_string());
                }
                Err(message) => {
                    let _ = tx
                        .send(Event::PreflightCheckFailed {
                            name: check.name().to_string(),
                            display_name: check.display_name().to_string(),
                            duration_ms,
                            message,
                            remediation: check.remediation(),
                            affected_steps: Vec::new(),
                            timestamp_ms: now_ms(),
                        })
                        .await;
                    outcome.failed.push(check.name().to_string());
                }
            }
        }
    }

    let _ = tx
        .send(Event::PreflightCompleted {
            success: outcome.success(),
            total_duration_ms: start.elapsed().as_millis() as u64,
            passed_count: outcome.passed.len(),
            failed_count: outcome.failed.len(),
            timestamp_ms: now_ms(),
        })
        .await;

    outcome
}

#[cfg(test)]
#[path = "preflight_tests.rs"]
mod tests;
