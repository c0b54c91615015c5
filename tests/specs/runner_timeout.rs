// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a hanging subprocess under timeout and one retry.

use std::time::{Duration, Instant};
use wl_runner::{CommandRunner, RunOptions};

#[tokio::test]
async fn timeout_with_one_retry_observes_two_attempts() {
    let runner = CommandRunner::new();
    let opts = RunOptions {
        timeout: Some(Duration::from_millis(50)),
        max_retries: 1,
        retry_delay: Duration::from_millis(10),
        ..RunOptions::default()
    };

    let start = Instant::now();
    let result = runner
        .run(&["sleep".to_string(), "600".to_string()], &opts)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(result.timed_out);
    assert_eq!(result.returncode, -1);
    // last attempt alone honored its deadline
    assert!(result.duration_ms >= 50);
    // two attempts plus the backoff delay
    assert!(elapsed >= Duration::from_millis(100));
}

#[tokio::test]
async fn zero_exit_within_limits_captures_everything() {
    let runner = CommandRunner::new();
    let result = runner
        .run(
            &[
                "sh".to_string(),
                "-c".to_string(),
                "printf 'all of it'".to_string(),
            ],
            &RunOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(result.returncode, 0);
    assert!(!result.timed_out);
    assert_eq!(result.stdout, "all of it");
}
