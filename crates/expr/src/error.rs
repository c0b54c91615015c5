// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expression error types

use thiserror::Error;

/// Syntax errors from tokenizing or parsing an expression body.
///
/// Tokenizer variants carry the byte position of the offending character
/// within the expression (not the enclosing template).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprSyntaxError {
    #[error("expression cannot start with a dot (position {position})")]
    LeadingDot { position: usize },

    #[error("expression cannot end with a dot (position {position})")]
    TrailingDot { position: usize },

    #[error("double dot in expression (position {position})")]
    DoubleDot { position: usize },

    #[error("unclosed bracket (position {position})")]
    UnclosedBracket { position: usize },

    #[error("unmatched closing bracket (position {position})")]
    UnmatchedClosingBracket { position: usize },

    #[error("invalid content in brackets (position {position})")]
    InvalidBracketContent { position: usize },

    #[error("unterminated string (position {position})")]
    UnterminatedString { position: usize },

    #[error("invalid character '{ch}' (position {position})")]
    InvalidCharacter { ch: char, position: usize },

    #[error("empty expression")]
    Empty,

    #[error("expression must start with 'inputs', 'steps', 'item' or 'index', found '{found}'")]
    UnknownRoot { found: String },

    #[error("'index' reference takes no path")]
    IndexWithPath,

    #[error("unexpected token {found} in expression")]
    UnexpectedToken { found: String },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },
}

impl ExprSyntaxError {
    /// Byte position of the error within the expression body, when known.
    pub fn position(&self) -> Option<usize> {
        match self {
            ExprSyntaxError::LeadingDot { position }
            | ExprSyntaxError::TrailingDot { position }
            | ExprSyntaxError::DoubleDot { position }
            | ExprSyntaxError::UnclosedBracket { position }
            | ExprSyntaxError::UnmatchedClosingBracket { position }
            | ExprSyntaxError::InvalidBracketContent { position }
            | ExprSyntaxError::UnterminatedString { position }
            | ExprSyntaxError::InvalidCharacter { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// A syntactically valid expression failed to resolve against the context.
///
/// Carries the full expression text and the sorted list of keys available
/// at the failing root, for actionable error output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} in expression '{expression}'{}", format_context_vars(.context_vars))]
pub struct ExprEvalError {
    pub message: String,
    pub expression: String,
    /// Sorted `root.key` names available at the root, e.g. `inputs.branch`.
    pub context_vars: Vec<String>,
}

impl ExprEvalError {
    pub fn new(
        message: impl Into<String>,
        expression: impl Into<String>,
        context_vars: Vec<String>,
    ) -> Self {
        Self {
            message: message.into(),
            expression: expression.into(),
            context_vars,
        }
    }
}

fn format_context_vars(vars: &[String]) -> String {
    if vars.is_empty() {
        String::new()
    } else {
        format!(" (available: {})", vars.join(", "))
    }
}

/// Either stage of expression failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error(transparent)]
    Syntax(#[from] ExprSyntaxError),
    #[error(transparent)]
    Eval(#[from] ExprEvalError),
}
