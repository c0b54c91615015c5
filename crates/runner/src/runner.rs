// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buffered command execution with timeout and retry

use crate::result::CommandResult;
use crate::secrets::scrub;
use crate::stream::StreamHandle;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// Grace period between SIGTERM and SIGKILL on timeout.
pub(crate) const TERMINATION_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Ceiling for exponential retry backoff.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// How long to wait for pipe readers after a kill.
const POST_KILL_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Errors raised before a process is spawned. Spawn failures themselves
/// are mapped onto returncode conventions and never escape as errors.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("working directory does not exist: {}", path.display())]
    WorkingDirectory { path: PathBuf },
    #[error("empty command")]
    EmptyCommand,
    /// Streaming only: [`CommandRunner::run`] maps spawn failures onto
    /// returncode conventions instead.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Per-call options for [`CommandRunner::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Override the runner's working directory.
    pub cwd: Option<PathBuf>,
    /// Override the runner's timeout. `Some(Duration::ZERO)` disables it.
    pub timeout: Option<Duration>,
    /// Additional environment for this call only.
    pub env: HashMap<String, String>,
    /// Maximum retry attempts beyond the first (total attempts = retries + 1).
    pub max_retries: u32,
    /// Initial backoff delay; doubles per attempt, capped at 10 s.
    pub retry_delay: Duration,
    /// Scrub sensitive patterns from captured stderr.
    pub scrub_secrets: bool,
}

/// Execute commands safely with timeout and environment control.
///
/// The runner inherits the parent environment and overlays its own
/// additions, validates the working directory before spawning, and
/// enforces the graceful-termination ladder on timeout.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
    env: HashMap<String, String>,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default working directory.
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.cwd = Some(path.into());
        self
    }

    /// Set the default wall-clock timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a default environment variable overlay.
    pub fn env(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.env.insert(key.into(), val.into());
        self
    }

    /// Run a command to completion, retrying retryable failures.
    ///
    /// Returns the last observed result when retries are exhausted; the
    /// only error path is an invalid working directory or empty argv.
    pub async fn run(
        &self,
        argv: &[String],
        opts: &RunOptions,
    ) -> Result<CommandResult, RunnerError> {
        if argv.is_empty() {
            return Err(RunnerError::EmptyCommand);
        }
        let cwd = self.effective_cwd(opts)?;
        let timeout = self.effective_timeout(opts);

        let mut attempt: u32 = 0;
        loop {
            let mut result = self.execute_once(argv, cwd.as_deref(), timeout, &opts.env).await;
            if opts.scrub_secrets {
                result.stderr = scrub(&result.stderr);
            }

            if result.success() || !is_retryable(&result) || attempt >= opts.max_retries {
                return Ok(result);
            }

            let delay = backoff_delay(opts.retry_delay, attempt);
            tracing::warn!(
                command = %argv[0],
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                timed_out = result.timed_out,
                "command failed with retryable error, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Spawn a command for line-buffered streaming.
    ///
    /// Lines from stdout and stderr are merged in arrival order; call
    /// [`StreamHandle::wait`] after draining to get the terminal result.
    pub async fn stream(
        &self,
        argv: &[String],
        opts: &RunOptions,
    ) -> Result<StreamHandle, RunnerError> {
        if argv.is_empty() {
            return Err(RunnerError::EmptyCommand);
        }
        let cwd = self.effective_cwd(opts)?;
        let timeout = self.effective_timeout(opts);
        StreamHandle::spawn(argv, cwd.as_deref(), timeout, &self.merged_env(&opts.env))
    }

    fn effective_cwd(&self, opts: &RunOptions) -> Result<Option<PathBuf>, RunnerError> {
        let cwd = opts.cwd.clone().or_else(|| self.cwd.clone());
        if let Some(path) = &cwd {
            if !path.is_dir() {
                return Err(RunnerError::WorkingDirectory { path: path.clone() });
            }
        }
        Ok(cwd)
    }

    fn effective_timeout(&self, opts: &RunOptions) -> Option<Duration> {
        let timeout = opts.timeout.or(self.timeout);
        timeout.filter(|t| !t.is_zero())
    }

    fn merged_env(&self, extra: &HashMap<String, String>) -> HashMap<String, String> {
        let mut env = self.env.clone();
        env.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }

    /// One attempt: spawn, pump output, enforce the timeout ladder.
    async fn execute_once(
        &self,
        argv: &[String],
        cwd: Option<&std::path::Path>,
        timeout: Option<Duration>,
        extra_env: &HashMap<String, String>,
    ) -> CommandResult {
        let start = Instant::now();

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // a dropped future must not leave a live child behind
            .kill_on_drop(true)
            .envs(self.merged_env(extra_env));
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return spawn_failure(&argv[0], &e, start),
        };

        // Detach the pipes so the child handle stays usable after timeout.
        let stdout_task = read_pipe(child.stdout.take());
        let stderr_task = read_pipe(child.stderr.take());

        let mut timed_out = false;
        let returncode = match wait_with_timeout(&mut child, timeout).await {
            WaitOutcome::Exited(code) => code,
            WaitOutcome::TimedOut => {
                timed_out = true;
                terminate_gracefully(&mut child).await;
                -1
            }
        };

        let stdout = collect_pipe(stdout_task, timed_out).await;
        let stderr = collect_pipe(stderr_task, timed_out).await;

        CommandResult {
            returncode,
            stdout,
            stderr,
            duration_ms: start.elapsed().as_millis() as u64,
            timed_out,
        }
    }
}

enum WaitOutcome {
    Exited(i32),
    TimedOut,
}

async fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> WaitOutcome {
    let wait = child.wait();
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, wait).await {
            Ok(status) => WaitOutcome::Exited(exit_code(status)),
            Err(_) => WaitOutcome::TimedOut,
        },
        None => WaitOutcome::Exited(exit_code(wait.await)),
    }
}

fn exit_code(status: std::io::Result<std::process::ExitStatus>) -> i32 {
    match status {
        Ok(status) => status.code().unwrap_or(-1),
        Err(_) => -1,
    }
}

/// SIGTERM, wait out the grace period, SIGKILL if still alive.
pub(crate) async fn terminate_gracefully(child: &mut Child) {
    if let Some(pid) = child.id() {
        send_sigterm(pid).await;
    }
    match tokio::time::timeout(TERMINATION_GRACE_PERIOD, child.wait()).await {
        Ok(_) => {}
        Err(_) => {
            let _ = child.kill().await;
        }
    }
}

/// Send SIGTERM via the system `kill` binary.
pub(crate) async fn send_sigterm(pid: u32) {
    let _ = Command::new("kill")
        .args(["-15", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
}

fn spawn_failure(program: &str, error: &std::io::Error, start: Instant) -> CommandResult {
    let (returncode, stderr) = match error.kind() {
        ErrorKind::NotFound => (127, format!("Command not found: {program}")),
        ErrorKind::PermissionDenied => (126, format!("Permission denied: {program}")),
        other => (-1, format!("Failed to spawn {program}: {other}")),
    };
    CommandResult {
        returncode,
        stdout: String::new(),
        stderr,
        duration_ms: start.elapsed().as_millis() as u64,
        timed_out: false,
    }
}

fn read_pipe<R>(pipe: Option<R>) -> tokio::task::JoinHandle<String>
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut pipe) = pipe else {
            return String::new();
        };
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Join a pipe reader. After a kill the pipes close on their own, but a
/// grandchild holding the write end could keep them open; bound the wait.
async fn collect_pipe(task: tokio::task::JoinHandle<String>, timed_out: bool) -> String {
    if timed_out {
        match tokio::time::timeout(POST_KILL_READ_TIMEOUT, task).await {
            Ok(Ok(text)) => text,
            Ok(Err(_)) => String::new(),
            Err(_) => String::new(),
        }
    } else {
        task.await.unwrap_or_default()
    }
}

/// A failure worth retrying: a timeout, or transient network/service
/// push-back reported on stderr.
fn is_retryable(result: &CommandResult) -> bool {
    if result.timed_out {
        return true;
    }
    let stderr = result.stderr.to_lowercase();
    stderr.contains("connection reset") || stderr.contains("rate limit")
}

fn backoff_delay(retry_delay: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    retry_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
