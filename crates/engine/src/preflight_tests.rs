// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Mutex;
use tokio::sync::mpsc;
use wl_core::Event;

struct StaticCheck {
    name: String,
    depends_on: Vec<String>,
    result: Result<String, String>,
    ran: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PreflightCheck for StaticCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> Vec<String> {
        self.depends_on.clone()
    }

    fn remediation(&self) -> String {
        "install the tool".to_string()
    }

    async fn run(&self) -> Result<String, String> {
        self.ran.lock().unwrap().push(self.name.clone());
        self.result.clone()
    }
}

fn check(
    name: &str,
    depends_on: &[&str],
    result: Result<&str, &str>,
    ran: &Arc<Mutex<Vec<String>>>,
) -> Arc<dyn PreflightCheck> {
    Arc::new(StaticCheck {
        name: name.to_string(),
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        result: result.map(str::to_string).map_err(str::to_string),
        ran: Arc::clone(ran),
    })
}

fn registered(
    checks: Vec<Arc<dyn PreflightCheck>>,
) -> BTreeMap<String, Arc<dyn PreflightCheck>> {
    checks
        .into_iter()
        .map(|c| (c.name().to_string(), c))
        .collect()
}

async fn run(
    registered_checks: &BTreeMap<String, Arc<dyn PreflightCheck>>,
    requested: &[&str],
) -> (PreflightOutcome, Vec<Event>) {
    let (tx, mut rx) = mpsc::channel(64);
    let requested: Vec<String> = requested.iter().map(|s| s.to_string()).collect();
    let outcome = run_preflight(registered_checks, &requested, &tx).await;
    drop(tx);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (outcome, events)
}

#[tokio::test]
async fn all_passing_checks_succeed() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let checks = registered(vec![
        check("git", &[], Ok("git 2.44"), &ran),
        check("gh", &[], Ok("gh 2.49"), &ran),
    ]);

    let (outcome, events) = run(&checks, &["git", "gh"]).await;
    assert!(outcome.success());
    assert_eq!(outcome.passed.len(), 2);

    assert!(matches!(events.first(), Some(Event::PreflightStarted { .. })));
    match events.last() {
        Some(Event::PreflightCompleted {
            success,
            passed_count,
            failed_count,
            ..
        }) => {
            assert!(success);
            assert_eq!(*passed_count, 2);
            assert_eq!(*failed_count, 0);
        }
        other => panic!("expected completed event, got {other:?}"),
    }
}

#[tokio::test]
async fn failing_check_fails_the_pass() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let checks = registered(vec![
        check("git", &[], Ok("ok"), &ran),
        check("auth", &[], Err("not logged in"), &ran),
    ]);

    let (outcome, events) = run(&checks, &["git", "auth"]).await;
    assert!(!outcome.success());
    assert_eq!(outcome.failed, vec!["auth"]);

    let failed = events.iter().find_map(|e| match e {
        Event::PreflightCheckFailed {
            name,
            message,
            remediation,
            ..
        } => Some((name.clone(), message.clone(), remediation.clone())),
        _ => None,
    });
    let (name, message, remediation) = failed.unwrap();
    assert_eq!(name, "auth");
    assert_eq!(message, "not logged in");
    assert_eq!(remediation, "install the tool");
}

#[tokio::test]
async fn dependents_run_after_their_dependencies() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let checks = registered(vec![
        check("gh_auth", &["gh"], Ok("ok"), &ran),
        check("gh", &[], Ok("ok"), &ran),
    ]);

    let (outcome, _) = run(&checks, &["gh", "gh_auth"]).await;
    assert!(outcome.success());
    let order = ran.lock().unwrap().clone();
    assert_eq!(order, vec!["gh", "gh_auth"]);
}

#[tokio::test]
async fn failed_dependency_skips_dependents() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let checks = registered(vec![
        check("gh", &[], Err("missing"), &ran),
        check("gh_auth", &["gh"], Ok("ok"), &ran),
    ]);

    let (outcome, events) = run(&checks, &["gh", "gh_auth"]).await;
    assert!(!outcome.success());
    assert_eq!(outcome.failed.len(), 2);
    // the dependent never executed
    assert_eq!(ran.lock().unwrap().clone(), vec!["gh"]);

    let skipped = events.iter().any(|e| matches!(
        e,
        Event::PreflightCheckFailed { name, message, .. }
            if name == "gh_auth" && message.contains("skipped because gh failed")
    ));
    assert!(skipped);
}

#[tokio::test]
async fn unknown_check_name_fails_without_aborting() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let checks = registered(vec![check("git", &[], Ok("ok"), &ran)]);

    let (outcome, _) = run(&checks, &["git", "nope"]).await;
    assert!(!outcome.success());
    assert_eq!(outcome.passed, vec!["git"]);
    assert_eq!(outcome.failed, vec!["nope"]);
}
