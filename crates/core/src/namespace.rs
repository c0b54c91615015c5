// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry namespace tags

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five component namespaces of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Actions,
    Agents,
    Generators,
    ContextBuilders,
    Workflows,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Actions => "actions",
            Namespace::Agents => "agents",
            Namespace::Generators => "generators",
            Namespace::ContextBuilders => "context_builders",
            Namespace::Workflows => "workflows",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
