// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: the same workflow name across all three tiers resolves to
//! the project copy with the shadowed files tracked.

use std::path::{Path, PathBuf};
use wl_workflow::{discover, DiscoveryLocations, WorkflowSource};

fn write_fly(dir: &Path, description: &str) -> PathBuf {
    let path = dir.join("fly.yaml");
    std::fs::write(
        &path,
        format!(
            "version: \"1.0\"\nname: fly\ndescription: {description}\nsteps:\n  - name: s\n    type: python\n    action: act\n"
        ),
    )
    .unwrap();
    path
}

#[test]
fn project_beats_user_beats_builtin() {
    let tmp = tempfile::tempdir().unwrap();
    let builtin = tmp.path().join("builtin");
    let user = tmp.path().join("user");
    let project = tmp.path().join("project");
    for dir in [&builtin, &user, &project] {
        std::fs::create_dir_all(dir).unwrap();
    }

    let builtin_path = write_fly(&builtin, "Builtin fly");
    let user_path = write_fly(&user, "User fly");
    let project_path = write_fly(&project, "Project fly");

    let locations = DiscoveryLocations {
        builtin: Some(builtin),
        user: Some(user),
        project: Some(project),
    };

    let result = discover(&locations);

    // one record, owned by the project tier
    assert_eq!(result.workflow_names(), vec!["fly"]);
    let fly = result.get_workflow("fly").unwrap();
    assert_eq!(fly.source, WorkflowSource::Project);
    assert_eq!(fly.file_path, project_path);
    assert_eq!(fly.workflow.description.as_deref(), Some("Project fly"));

    // the shadowed copies are tracked, higher tier first
    assert_eq!(fly.overrides, vec![user_path, builtin_path]);

    // the user copy does not leak in under another name
    assert!(result.workflows.iter().all(|w| w.source == WorkflowSource::Project));

    // scanning again is idempotent
    let again = discover(&locations);
    assert_eq!(again.workflow_names(), result.workflow_names());
    assert_eq!(again.skipped.len(), result.skipped.len());
}
