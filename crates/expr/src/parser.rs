// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expression parser
//!
//! Grammar, lowest precedence first: ternary (`A if C else B`), `or`,
//! `and`, `not`, reference. Negation is absorbed into the reference it
//! applies to rather than kept as a separate node.

use crate::error::ExprSyntaxError;
use crate::token::{tokenize, Token};

/// Root a reference resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Input,
    Step,
    Item,
    Index,
}

/// One access segment of a reference path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Dotted field name. The first segment is always the root name
    /// (`inputs`, `steps`, `item`, `index`) and is not looked up.
    Key(String),
    /// Bracketed integer index; negative values count from the end.
    Index(i64),
    /// Bracketed quoted key, for names the dotted form cannot express.
    QuotedKey(String),
}

/// Boolean combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// Parsed expression AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ref {
        kind: RefKind,
        path: Vec<Segment>,
        negated: bool,
        raw: String,
    },
    Bool {
        op: BoolOp,
        operands: Vec<Expr>,
        raw: String,
    },
    Ternary {
        condition: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
        raw: String,
    },
}

impl Expr {
    /// The source text this expression was parsed from.
    pub fn raw(&self) -> &str {
        match self {
            Expr::Ref { raw, .. } | Expr::Bool { raw, .. } | Expr::Ternary { raw, .. } => raw,
        }
    }
}

/// Parse an expression body (the text between `${{` and `}}`).
pub fn parse(input: &str) -> Result<Expr, ExprSyntaxError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprSyntaxError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        raw: input.trim().to_string(),
    };
    let expr = parser.ternary()?;
    if let Some(extra) = parser.peek() {
        return Err(ExprSyntaxError::UnexpectedToken {
            found: extra.to_string(),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    raw: String,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name == word)
    }

    /// `value if condition else value`, right-associative on the else arm.
    fn ternary(&mut self) -> Result<Expr, ExprSyntaxError> {
        let value = self.or_expr()?;
        if !self.peek_keyword("if") {
            return Ok(value);
        }
        self.pos += 1;
        let condition = self.or_expr()?;
        if !self.peek_keyword("else") {
            return Err(ExprSyntaxError::UnexpectedEnd {
                expected: "'else'".to_string(),
            });
        }
        self.pos += 1;
        let if_false = self.ternary()?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            if_true: Box::new(value),
            if_false: Box::new(if_false),
            raw: self.raw.clone(),
        })
    }

    fn or_expr(&mut self) -> Result<Expr, ExprSyntaxError> {
        let first = self.and_expr()?;
        if !self.peek_keyword("or") {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.peek_keyword("or") {
            self.pos += 1;
            operands.push(self.and_expr()?);
        }
        Ok(Expr::Bool {
            op: BoolOp::Or,
            operands,
            raw: self.raw.clone(),
        })
    }

    fn and_expr(&mut self) -> Result<Expr, ExprSyntaxError> {
        let first = self.not_expr()?;
        if !self.peek_keyword("and") {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.peek_keyword("and") {
            self.pos += 1;
            operands.push(self.not_expr()?);
        }
        Ok(Expr::Bool {
            op: BoolOp::And,
            operands,
            raw: self.raw.clone(),
        })
    }

    fn not_expr(&mut self) -> Result<Expr, ExprSyntaxError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.pos += 1;
            let mut inner = self.reference()?;
            if let Expr::Ref { negated, .. } = &mut inner {
                *negated = true;
            }
            return Ok(inner);
        }
        self.reference()
    }

    fn reference(&mut self) -> Result<Expr, ExprSyntaxError> {
        let root = match self.next() {
            Some(Token::Ident(name)) => name,
            Some(other) => {
                return Err(ExprSyntaxError::UnexpectedToken {
                    found: other.to_string(),
                })
            }
            None => {
                return Err(ExprSyntaxError::UnexpectedEnd {
                    expected: "a reference".to_string(),
                })
            }
        };

        let kind = match root.as_str() {
            "inputs" => RefKind::Input,
            "steps" => RefKind::Step,
            "item" => RefKind::Item,
            "index" => RefKind::Index,
            other => {
                return Err(ExprSyntaxError::UnknownRoot {
                    found: other.to_string(),
                })
            }
        };

        let mut path = vec![Segment::Key(root)];

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Ident(name)) => path.push(Segment::Key(name)),
                        Some(other) => {
                            return Err(ExprSyntaxError::UnexpectedToken {
                                found: other.to_string(),
                            })
                        }
                        None => {
                            return Err(ExprSyntaxError::UnexpectedEnd {
                                expected: "a field name".to_string(),
                            })
                        }
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Int(n)) => path.push(Segment::Index(n)),
                        Some(Token::Str(key)) => path.push(Segment::QuotedKey(key)),
                        Some(other) => {
                            return Err(ExprSyntaxError::UnexpectedToken {
                                found: other.to_string(),
                            })
                        }
                        None => {
                            return Err(ExprSyntaxError::UnexpectedEnd {
                                expected: "an index or key".to_string(),
                            })
                        }
                    }
                    // tokenizer guarantees the closing bracket
                    match self.next() {
                        Some(Token::RBracket) => {}
                        _ => {
                            return Err(ExprSyntaxError::UnexpectedEnd {
                                expected: "']'".to_string(),
                            })
                        }
                    }
                }
                _ => break,
            }
        }

        if kind == RefKind::Index && path.len() > 1 {
            return Err(ExprSyntaxError::IndexWithPath);
        }

        Ok(Expr::Ref {
            kind,
            path,
            negated: false,
            raw: self.raw.clone(),
        })
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
