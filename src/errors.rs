//! Error taxonomy for the runtime
//!
//! Two families:
//! - `ParseError`: the external parser handed us a tree we could not bind.
//!   Carries the failing line/token and a rendered source excerpt.
//! - `RuntimeError`: a violation detected while evaluating. Carries a line
//!   number. `Thrown` wraps a language-level value raised by the program
//!   itself and is kept distinct from internally-detected violations so
//!   hosts can treat it as a business signal rather than a defect.
//!
//! All errors are unchecked from the host's point of view: the engine never
//! retries or swallows them, and a raised error aborts the remainder of the
//! current evaluation.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/* ===================== Parse Errors ===================== */

/// Failure to bind a parsed tree to the typed AST.
#[derive(Debug, Clone, Error)]
#[error("parse error at line {line}: {message}\n{context}")]
pub struct ParseError {
    /// 1-indexed source line of the offending node (0 if unknown)
    pub line: usize,
    /// 1-indexed column of the offending token (0 if unknown)
    pub column: usize,
    /// The token or node kind that failed to bind
    pub token: String,
    pub message: String,
    /// Rendered source excerpt with a caret under the offending span
    pub context: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>, token: impl Into<String>, line: usize) -> Self {
        Self {
            line,
            column: 0,
            token: token.into(),
            message: message.into(),
            context: String::new(),
        }
    }

    /// Attach rendered source context to this error.
    pub fn with_source(mut self, source: &str, column: usize, span_len: usize) -> Self {
        self.column = column;
        self.context = render_context(source, self.line, column, span_len);
        self
    }
}

/// Render the ±5 lines around `line` with a caret under the offending span.
///
/// `line` and `column` are 1-indexed; a zero line yields an empty excerpt.
pub fn render_context(source: &str, line: usize, column: usize, span_len: usize) -> String {
    if line == 0 {
        return String::new();
    }

    let lines: Vec<&str> = source.lines().collect();
    let idx = line - 1;
    if idx >= lines.len() {
        return String::new();
    }

    let first = idx.saturating_sub(5);
    let last = (idx + 5).min(lines.len() - 1);
    let width = (last + 1).to_string().len();

    let mut out = String::new();
    for i in first..=last {
        out.push_str(&format!("{:>width$} | {}\n", i + 1, lines[i], width = width));
        if i == idx {
            let pad = column.saturating_sub(1);
            let caret = "^".repeat(span_len.max(1));
            out.push_str(&format!("{:>width$} | {}{}\n", "", " ".repeat(pad), caret, width = width));
        }
    }
    out
}

/* ===================== Runtime Errors ===================== */

/// A violation detected during evaluation.
///
/// Every variant carries the source line (1-indexed, 0 when the location is
/// not attributable to a single node).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum RuntimeError {
    #[error("line {line}: wrong number of arguments for '{name}': expected {expected}, got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("line {line}: assignment into constant variable '{name}'")]
    ConstantAssignment { name: String, line: usize },

    #[error("line {line}: cannot assign through '{segment}': not a map")]
    BadAssignTarget { segment: String, line: usize },

    #[error("line {line}: stack too deep in '{name}' (depth {depth})")]
    StackTooDeep {
        name: String,
        depth: usize,
        line: usize,
    },

    #[error("line {line}: Not allowed")]
    NotAllowed { line: usize },

    #[error("line {line}: cannot suspend")]
    CannotSuspend { line: usize },

    #[error("line {line}: {message}")]
    UnsupportedOperation { message: String, line: usize },

    #[error("line {line}: type error: {message}")]
    TypeError { message: String, line: usize },

    /// A value raised by the program itself (`fail(...)` / `throw`).
    /// Catchable by a language-level `try`/`catch`.
    #[error("line {line}: script error: {value:?}")]
    Thrown { value: Value, line: usize },
}

impl RuntimeError {
    pub fn unsupported(message: impl Into<String>, line: usize) -> Self {
        RuntimeError::UnsupportedOperation {
            message: message.into(),
            line,
        }
    }

    pub fn type_error(message: impl Into<String>, line: usize) -> Self {
        RuntimeError::TypeError {
            message: message.into(),
            line,
        }
    }

    /// Attribute this error to `line` when it has no location yet.
    /// Handlers raise with line 0; the call site fills it in.
    pub fn at_line(mut self, new_line: usize) -> Self {
        let line = match &mut self {
            RuntimeError::ArityMismatch { line, .. }
            | RuntimeError::ConstantAssignment { line, .. }
            | RuntimeError::BadAssignTarget { line, .. }
            | RuntimeError::StackTooDeep { line, .. }
            | RuntimeError::NotAllowed { line }
            | RuntimeError::CannotSuspend { line }
            | RuntimeError::UnsupportedOperation { line, .. }
            | RuntimeError::TypeError { line, .. }
            | RuntimeError::Thrown { line, .. } => line,
        };
        if *line == 0 {
            *line = new_line;
        }
        self
    }

    /// The source line this error is attributed to.
    pub fn line(&self) -> usize {
        match self {
            RuntimeError::ArityMismatch { line, .. }
            | RuntimeError::ConstantAssignment { line, .. }
            | RuntimeError::BadAssignTarget { line, .. }
            | RuntimeError::StackTooDeep { line, .. }
            | RuntimeError::NotAllowed { line }
            | RuntimeError::CannotSuspend { line }
            | RuntimeError::UnsupportedOperation { line, .. }
            | RuntimeError::TypeError { line, .. }
            | RuntimeError::Thrown { line, .. } => *line,
        }
    }
}
