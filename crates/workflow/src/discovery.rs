// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-source workflow discovery
//!
//! Scans the project, user, and builtin workflow directories in
//! precedence order (project > user > builtin), keys parsed documents by
//! their declared name, tracks which lower-precedence files each record
//! shadows, and never aborts on a malformed file; it is recorded as
//! skipped and the scan continues.

use crate::parser::parse_workflow;
use crate::schema::WorkflowDocument;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Where a discovered workflow came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowSource {
    Builtin,
    User,
    Project,
}

impl fmt::Display for WorkflowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowSource::Builtin => f.write_str("builtin"),
            WorkflowSource::User => f.write_str("user"),
            WorkflowSource::Project => f.write_str("project"),
        }
    }
}

/// A workflow (or fragment) claimed by the highest-precedence source
/// that defines its name.
#[derive(Debug, Clone)]
pub struct DiscoveredWorkflow {
    pub source: WorkflowSource,
    pub file_path: PathBuf,
    pub workflow: WorkflowDocument,
    /// Lower-precedence files shadowed by this record.
    pub overrides: Vec<PathBuf>,
}

/// A file that failed to parse during discovery.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub file_path: PathBuf,
    /// Stable error code, e.g. `yaml-syntax`.
    pub error_type: String,
    pub error_message: String,
}

/// Outcome of one discovery scan. Listings are sorted by name.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    pub workflows: Vec<DiscoveredWorkflow>,
    pub fragments: Vec<DiscoveredWorkflow>,
    pub skipped: Vec<SkippedFile>,
    pub locations_scanned: Vec<PathBuf>,
    pub discovery_time_ms: u64,
}

impl DiscoveryResult {
    pub fn get_workflow(&self, name: &str) -> Option<&DiscoveredWorkflow> {
        self.workflows.iter().find(|w| w.workflow.name == name)
    }

    pub fn get_fragment(&self, name: &str) -> Option<&DiscoveredWorkflow> {
        self.fragments.iter().find(|w| w.workflow.name == name)
    }

    pub fn workflow_names(&self) -> Vec<&str> {
        self.workflows.iter().map(|w| w.workflow.name.as_str()).collect()
    }

    pub fn fragment_names(&self) -> Vec<&str> {
        self.fragments.iter().map(|w| w.workflow.name.as_str()).collect()
    }
}

/// The directory tiers to scan. Any tier may be absent.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryLocations {
    pub builtin: Option<PathBuf>,
    pub user: Option<PathBuf>,
    pub project: Option<PathBuf>,
}

impl DiscoveryLocations {
    /// The standard tiers: `./.windlass/workflows` for the project and
    /// `~/.config/windlass/workflows` for the user. Builtins ship with
    /// the install and are wired up by the caller.
    pub fn standard(project_root: &Path) -> Self {
        Self {
            builtin: None,
            user: dirs::config_dir().map(|dir| dir.join("windlass").join("workflows")),
            project: Some(project_root.join(".windlass").join("workflows")),
        }
    }
}

/// Scan all enabled tiers and apply precedence.
pub fn discover(locations: &DiscoveryLocations) -> DiscoveryResult {
    let start = Instant::now();
    let mut workflows: IndexMap<String, DiscoveredWorkflow> = IndexMap::new();
    let mut fragments: IndexMap<String, DiscoveredWorkflow> = IndexMap::new();
    let mut skipped = Vec::new();
    let mut locations_scanned = Vec::new();

    let tiers = [
        (WorkflowSource::Project, &locations.project),
        (WorkflowSource::User, &locations.user),
        (WorkflowSource::Builtin, &locations.builtin),
    ];

    for (source, root) in tiers {
        let Some(root) = root else { continue };
        if !root.is_dir() {
            continue;
        }
        locations_scanned.push(root.clone());

        scan_directory(root, source, &mut workflows, &mut skipped);
        let fragments_dir = root.join("fragments");
        if fragments_dir.is_dir() {
            scan_directory(&fragments_dir, source, &mut fragments, &mut skipped);
        }
    }

    let mut result = DiscoveryResult {
        workflows: workflows.into_values().collect(),
        fragments: fragments.into_values().collect(),
        skipped,
        locations_scanned,
        discovery_time_ms: start.elapsed().as_millis() as u64,
    };
    result.workflows.sort_by(|a, b| a.workflow.name.cmp(&b.workflow.name));
    result.fragments.sort_by(|a, b| a.workflow.name.cmp(&b.workflow.name));
    result
}

/// Parse every `*.yaml`/`*.yml` directly in `dir`, keying by document
/// name. A name already claimed by a higher-precedence tier absorbs the
/// file path into that record's overrides.
fn scan_directory(
    dir: &Path,
    source: WorkflowSource,
    claimed: &mut IndexMap<String, DiscoveredWorkflow>,
    skipped: &mut Vec<SkippedFile>,
) {
    for path in yaml_files(dir, skipped) {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable workflow file");
                skipped.push(SkippedFile {
                    file_path: path,
                    error_type: "io".to_string(),
                    error_message: e.to_string(),
                });
                continue;
            }
        };
        let workflow = match parse_workflow(&content) {
            Ok(workflow) => workflow,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping invalid workflow file");
                skipped.push(SkippedFile {
                    file_path: path,
                    error_type: e.code().to_string(),
                    error_message: e.to_string(),
                });
                continue;
            }
        };

        match claimed.get_mut(&workflow.name) {
            Some(winner) => winner.overrides.push(path),
            None => {
                claimed.insert(
                    workflow.name.clone(),
                    DiscoveredWorkflow {
                        source,
                        file_path: path,
                        workflow,
                        overrides: Vec::new(),
                    },
                );
            }
        }
    }
}

/// Sorted `*.yaml`/`*.yml` entries directly under `dir`.
fn yaml_files(dir: &Path, skipped: &mut Vec<SkippedFile>) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            skipped.push(SkippedFile {
                file_path: dir.to_path_buf(),
                error_type: "io".to_string(),
                error_message: e.to_string(),
            });
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
