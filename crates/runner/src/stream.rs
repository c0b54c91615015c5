// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-buffered streaming execution
//!
//! One reader task per stream pushes lines into a merge channel in
//! arrival order; a watchdog task enforces the timeout ladder. The
//! consumer drains [`StreamHandle::next_line`] and then calls
//! [`StreamHandle::wait`] for the terminal [`CommandResult`].

use crate::result::{CommandResult, StreamKind, StreamLine};
use crate::runner::{send_sigterm, RunnerError, TERMINATION_GRACE_PERIOD};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

const LINE_CHANNEL_CAPACITY: usize = 256;

/// Handle to a streaming subprocess.
#[derive(Debug)]
pub struct StreamHandle {
    rx: mpsc::Receiver<StreamLine>,
    child: Child,
    start: Instant,
    stdout_lines: Arc<Mutex<Vec<String>>>,
    stderr_lines: Arc<Mutex<Vec<String>>>,
    timed_out: Arc<AtomicBool>,
    readers: Vec<tokio::task::JoinHandle<()>>,
    watchdog: Option<tokio::task::JoinHandle<()>>,
}

impl StreamHandle {
    pub(crate) fn spawn(
        argv: &[String],
        cwd: Option<&Path>,
        timeout: Option<Duration>,
        env: &HashMap<String, String>,
    ) -> Result<Self, RunnerError> {
        let start = Instant::now();

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // a dropped handle must not leave a live child behind
            .kill_on_drop(true)
            .envs(env);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
            program: argv[0].clone(),
            source,
        })?;

        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let stdout_lines = Arc::new(Mutex::new(Vec::new()));
        let stderr_lines = Arc::new(Mutex::new(Vec::new()));
        let timed_out = Arc::new(AtomicBool::new(false));

        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(read_lines(
                stdout,
                StreamKind::Stdout,
                tx.clone(),
                Arc::clone(&stdout_lines),
                start,
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(read_lines(
                stderr,
                StreamKind::Stderr,
                tx,
                Arc::clone(&stderr_lines),
                start,
            ));
        }

        let watchdog = timeout.map(|limit| {
            let timed_out = Arc::clone(&timed_out);
            let pid = child.id();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                timed_out.store(true, Ordering::SeqCst);
                if let Some(pid) = pid {
                    send_sigterm(pid).await;
                    tokio::time::sleep(TERMINATION_GRACE_PERIOD).await;
                    force_kill(pid).await;
                }
            })
        });

        Ok(Self {
            rx,
            child,
            start,
            stdout_lines,
            stderr_lines,
            timed_out,
            readers,
            watchdog,
        })
    }

    /// Next merged output line, or `None` when both streams are closed.
    pub async fn next_line(&mut self) -> Option<StreamLine> {
        self.rx.recv().await
    }

    /// Wait for the process and return the terminal result.
    ///
    /// Captured lines are joined per stream; `timed_out` reflects the
    /// watchdog.
    pub async fn wait(mut self) -> CommandResult {
        // Unblock readers stuck on a full channel, then drain them.
        drop(self.rx);
        for reader in self.readers.drain(..) {
            let _ = reader.await;
        }

        let returncode = match self.child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(_) => -1,
        };

        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }

        let timed_out = self.timed_out.load(Ordering::SeqCst);
        CommandResult {
            returncode: if timed_out { -1 } else { returncode },
            stdout: self.stdout_lines.lock().join("\n"),
            stderr: self.stderr_lines.lock().join("\n"),
            duration_ms: self.start.elapsed().as_millis() as u64,
            timed_out,
        }
    }
}

fn read_lines<R>(
    pipe: R,
    which: StreamKind,
    tx: mpsc::Sender<StreamLine>,
    store: Arc<Mutex<Vec<String>>>,
    start: Instant,
) -> tokio::task::JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            store.lock().push(line.clone());
            let message = StreamLine {
                content: line,
                which,
                timestamp_ms: start.elapsed().as_millis() as u64,
            };
            if tx.send(message).await.is_err() {
                // consumer stopped reading; keep draining into the store
                continue;
            }
        }
    })
}

async fn force_kill(pid: u32) {
    let _ = Command::new("kill")
        .args(["-9", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
