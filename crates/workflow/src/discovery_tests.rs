// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;

fn write_workflow_file(dir: &Path, file: &str, name: &str, description: &str) -> PathBuf {
    let path = dir.join(file);
    let content = format!(
        "version: \"1.0\"\nname: {name}\ndescription: {description}\nsteps:\n  - name: s\n    type: python\n    action: act\n"
    );
    std::fs::write(&path, content).unwrap();
    path
}

fn locations(root: &Path) -> (DiscoveryLocations, PathBuf, PathBuf, PathBuf) {
    let builtin = root.join("builtin");
    let user = root.join("user");
    let project = root.join("project");
    std::fs::create_dir_all(&builtin).unwrap();
    std::fs::create_dir_all(&user).unwrap();
    std::fs::create_dir_all(&project).unwrap();
    (
        DiscoveryLocations {
            builtin: Some(builtin.clone()),
            user: Some(user.clone()),
            project: Some(project.clone()),
        },
        builtin,
        user,
        project,
    )
}

#[test]
fn project_overrides_user_overrides_builtin() {
    let tmp = tempfile::tempdir().unwrap();
    let (locations, builtin, user, project) = locations(tmp.path());

    let builtin_path = write_workflow_file(&builtin, "fly.yaml", "fly", "Builtin fly");
    let user_path = write_workflow_file(&user, "fly.yaml", "fly", "User fly");
    let project_path = write_workflow_file(&project, "fly.yaml", "fly", "Project fly");

    let result = discover(&locations);
    assert_eq!(result.workflow_names(), vec!["fly"]);

    let fly = result.get_workflow("fly").unwrap();
    assert_eq!(fly.source, WorkflowSource::Project);
    assert_eq!(fly.file_path, project_path);
    assert_eq!(
        fly.workflow.description.as_deref(),
        Some("Project fly")
    );
    assert_eq!(fly.overrides, vec![user_path, builtin_path]);
}

#[test]
fn unique_names_from_all_tiers_are_returned_sorted() {
    let tmp = tempfile::tempdir().unwrap();
    let (locations, builtin, user, project) = locations(tmp.path());

    write_workflow_file(&builtin, "zeta.yaml", "zeta", "Builtin");
    write_workflow_file(&user, "custom.yaml", "custom", "User only");
    write_workflow_file(&project, "deploy.yaml", "deploy", "Project only");

    let result = discover(&locations);
    assert_eq!(result.workflow_names(), vec!["custom", "deploy", "zeta"]);
    assert_eq!(
        result.get_workflow("custom").unwrap().source,
        WorkflowSource::User
    );
}

#[test]
fn invalid_files_are_skipped_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let (locations, _, _, project) = locations(tmp.path());

    write_workflow_file(&project, "good.yaml", "good", "Valid");
    std::fs::write(project.join("broken.yaml"), "version: [unclosed").unwrap();
    std::fs::write(
        project.join("wrong-version.yaml"),
        "version: \"9.9\"\nname: wv\nsteps:\n  - name: s\n    type: python\n    action: a\n",
    )
    .unwrap();

    let result = discover(&locations);
    assert_eq!(result.workflow_names(), vec!["good"]);
    assert_eq!(result.skipped.len(), 2);
    let types: Vec<&str> = result.skipped.iter().map(|s| s.error_type.as_str()).collect();
    assert!(types.contains(&"yaml-syntax"));
    assert!(types.contains(&"unsupported-version"));
}

#[test]
fn fragments_live_in_their_own_namespace() {
    let tmp = tempfile::tempdir().unwrap();
    let (locations, _, user, project) = locations(tmp.path());

    let project_fragments = project.join("fragments");
    let user_fragments = user.join("fragments");
    std::fs::create_dir_all(&project_fragments).unwrap();
    std::fs::create_dir_all(&user_fragments).unwrap();

    write_workflow_file(&project, "deploy.yaml", "deploy", "Workflow");
    write_workflow_file(&project_fragments, "commit.yaml", "commit-push", "Project fragment");
    write_workflow_file(&user_fragments, "commit.yaml", "commit-push", "User fragment");

    let result = discover(&locations);
    assert_eq!(result.workflow_names(), vec!["deploy"]);
    assert_eq!(result.fragment_names(), vec!["commit-push"]);

    let fragment = result.get_fragment("commit-push").unwrap();
    assert_eq!(fragment.source, WorkflowSource::Project);
    assert_eq!(fragment.overrides.len(), 1);
}

#[test]
fn discovery_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let (locations, builtin, user, project) = locations(tmp.path());

    write_workflow_file(&builtin, "a.yaml", "alpha", "A");
    write_workflow_file(&user, "b.yaml", "beta", "B");
    write_workflow_file(&project, "c.yaml", "gamma", "C");
    std::fs::write(project.join("bad.yml"), "nope: [").unwrap();

    let first = discover(&locations);
    let second = discover(&locations);
    assert_eq!(first.workflow_names(), second.workflow_names());
    assert_eq!(first.fragment_names(), second.fragment_names());
    assert_eq!(first.skipped.len(), second.skipped.len());
}

#[test]
fn missing_tiers_are_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let project = tmp.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    write_workflow_file(&project, "only.yaml", "only", "Only");

    let locations = DiscoveryLocations {
        builtin: Some(tmp.path().join("does-not-exist")),
        user: None,
        project: Some(project),
    };
    let result = discover(&locations);
    assert_eq!(result.workflow_names(), vec!["only"]);
    assert_eq!(result.locations_scanned.len(), 1);
}

#[test]
fn non_yaml_files_are_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let (locations, _, _, project) = locations(tmp.path());
    write_workflow_file(&project, "real.yaml", "real", "Real");
    std::fs::write(project.join("notes.txt"), "not a workflow").unwrap();
    std::fs::write(project.join("README.md"), "# readme").unwrap();

    let result = discover(&locations);
    assert_eq!(result.workflow_names(), vec!["real"]);
    assert!(result.skipped.is_empty());
}
