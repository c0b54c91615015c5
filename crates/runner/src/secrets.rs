// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret scrubbing for captured subprocess output

use regex::Regex;
use std::sync::LazyLock;

const REDACTED: &str = "***REDACTED***";

/// Sensitive patterns, compiled once.
// Allow expect here as the regex patterns are compile-time verified to be valid
#[allow(clippy::expect_used)]
static SENSITIVE_PATTERNS: LazyLock<Vec<(Regex, String)>> = LazyLock::new(|| {
    vec![
        // GitHub token prefixes: ghp_, gho_, ghu_, ghs_, ghr_
        (
            Regex::new(r"gh[posur]_[A-Za-z0-9]{16,}").expect("constant regex pattern is valid"),
            REDACTED.to_string(),
        ),
        // AWS access key ids
        (
            Regex::new(r"AKIA[0-9A-Z]{16}").expect("constant regex pattern is valid"),
            REDACTED.to_string(),
        ),
        // Authorization headers with bearer tokens
        (
            Regex::new(r"(?i)authorization:\s*bearer\s+\S+")
                .expect("constant regex pattern is valid"),
            format!("Authorization: Bearer {REDACTED}"),
        ),
        // Generic password/api-key/secret/token assignments
        (
            Regex::new(r"(?i)(password|api[_-]?key|secret|token)\s*[:=]\s*\S+")
                .expect("constant regex pattern is valid"),
            format!("${{1}}={REDACTED}"),
        ),
    ]
});

/// Replace every sensitive match in `text` with `***REDACTED***`.
///
/// Keeps the key name of generic `key=value` assignments so logs stay
/// diagnosable.
pub fn scrub(text: &str) -> String {
    let mut result = text.to_string();
    for (pattern, replacement) in SENSITIVE_PATTERNS.iter() {
        result = pattern.replace_all(&result, replacement.as_str()).to_string();
    }
    result
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
