// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-backed preflight checks
//!
//! Most prerequisites boil down to "this command exits zero" (tool on
//! PATH, auth valid, identity configured). [`CommandCheck`] wraps the
//! subprocess runner for that shape, and [`standard_checks`] provides
//! the stock git/gh set workflows reference by name.

use crate::preflight::PreflightCheck;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use wl_runner::{CommandRunner, RunOptions};

/// Leave headroom under the preflight runner's own per-check deadline.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(4);

/// A preflight check that passes when a command exits zero.
pub struct CommandCheck {
    name: String,
    display_name: String,
    argv: Vec<String>,
    depends_on: Vec<String>,
    remediation: String,
    /// Also require non-empty stdout (e.g. `git config user.name`).
    require_stdout: bool,
    runner: CommandRunner,
}

impl CommandCheck {
    pub fn new(name: impl Into<String>, argv: &[&str]) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            argv: argv.iter().map(|s| s.to_string()).collect(),
            depends_on: Vec::new(),
            remediation: String::new(),
            require_stdout: false,
            runner: CommandRunner::new().timeout(COMMAND_TIMEOUT),
        }
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn depends_on(mut self, names: &[&str]) -> Self {
        self.depends_on = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }

    pub fn require_stdout(mut self) -> Self {
        self.require_stdout = true;
        self
    }
}

#[async_trait]
impl PreflightCheck for CommandCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn depends_on(&self) -> Vec<String> {
        self.depends_on.clone()
    }

    fn remediation(&self) -> String {
        self.remediation.clone()
    }

    async fn run(&self) -> Result<String, String> {
        let result = self
            .runner
            .run(&self.argv, &RunOptions::default())
            .await
            .map_err(|e| e.to_string())?;

        if result.timed_out {
            return Err(format!("'{}' timed out", self.argv.join(" ")));
        }
        if !result.success() {
            let detail = result
                .stderr
                .lines()
                .next()
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("exit code {}", result.returncode));
            return Err(detail);
        }
        if self.require_stdout && result.stdout.trim().is_empty() {
            return Err("not configured".to_string());
        }

        let message = result
            .stdout
            .lines()
            .next()
            .unwrap_or("ok")
            .trim()
            .to_string();
        Ok(if message.is_empty() { "ok".to_string() } else { message })
    }
}

/// The stock prerequisite set: git, git identity, GitHub CLI, GitHub
/// auth.
pub fn standard_checks() -> Vec<Arc<dyn PreflightCheck>> {
    vec![
        Arc::new(
            CommandCheck::new("git", &["git", "--version"])
                .display_name("Git")
                .remediation("Install git and ensure it is on PATH"),
        ),
        Arc::new(
            CommandCheck::new("git_identity", &["git", "config", "user.name"])
                .display_name("Git identity")
                .depends_on(&["git"])
                .require_stdout()
                .remediation("Run: git config --global user.name 'Your Name'"),
        ),
        Arc::new(
            CommandCheck::new("gh", &["gh", "--version"])
                .display_name("GitHub CLI")
                .remediation("Install the GitHub CLI (gh)"),
        ),
        Arc::new(
            CommandCheck::new("gh_auth", &["gh", "auth", "status"])
                .display_name("GitHub auth")
                .depends_on(&["gh"])
                .remediation("Run: gh auth login"),
        ),
    ]
}

#[cfg(test)]
#[path = "checks_tests.rs"]
mod tests;
