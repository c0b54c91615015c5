// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wl-runner: async subprocess execution
//!
//! Launches external programs with a fixed argv (no shell expansion),
//! inherit-and-override environment, wall-clock timeout with a graceful
//! termination ladder (SIGTERM, grace period, SIGKILL), bounded
//! exponential retry, line-buffered streaming, and secret scrubbing of
//! captured stderr.
//!
//! # Example
//!
//! ```no_run
//! use wl_runner::{CommandRunner, RunOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = CommandRunner::new().timeout(std::time::Duration::from_secs(120));
//! let result = runner
//!     .run(&["git".into(), "status".into()], &RunOptions::default())
//!     .await?;
//! assert_eq!(result.returncode, 0);
//! # Ok(())
//! # }
//! ```

pub mod result;
pub mod runner;
pub mod secrets;
pub mod stream;

pub use result::{CommandResult, StreamKind, StreamLine};
pub use runner::{CommandRunner, RunOptions, RunnerError};
pub use secrets::scrub;
pub use stream::StreamHandle;
