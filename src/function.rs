//! Function and closure model
//!
//! A `Function` is created once at definition time: ordered formal
//! parameters, the body subtree, and the captured definition-site scope.
//! Invocation copies the function so concurrent recursive calls cannot bleed
//! state, but all copies share one entry counter, the recursion guard,
//! since the tree walker recurses natively per language call and must abort
//! a runaway self-call before the host stack overflows.

use crate::config::RuntimeConfig;
use crate::engine::ast::Stmt;
use crate::errors::RuntimeError;
use crate::scope::ScopeRef;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use tracing::warn;

/* ===================== Function ===================== */

#[derive(Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    /// Ordered formal parameter names; call arity must match exactly
    pub params: Vec<String>,
    /// Boxed: a function is reachable from `Value`, and the body tree
    /// contains `Value` literals, so the indirection closes the type cycle.
    pub body: Box<Stmt>,
    /// Definition-site scope (closure), not the caller's scope.
    /// Not serialized: a persisted suspended run re-captures on re-binding.
    #[serde(skip)]
    pub captured: Option<ScopeRef>,
    /// Live entry count, shared across per-invocation copies
    #[serde(skip)]
    depth: Rc<Cell<usize>>,
}

// The captured scope can hold the function itself (a definition closes over
// the scope it is bound in), so deriving Debug would recurse through the
// cycle. Print the shape only.
impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("depth", &self.depth.get())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params && self.body == other.body
    }
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: Stmt, captured: ScopeRef) -> Self {
        Self {
            name: name.into(),
            params,
            body: Box::new(body),
            captured: Some(captured),
            depth: Rc::new(Cell::new(0)),
        }
    }

    /// Check arity before the body executes.
    pub fn check_arity(&self, got: usize, line: usize) -> Result<(), RuntimeError> {
        if got != self.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: self.name.clone(),
                expected: self.params.len(),
                got,
                line,
            });
        }
        Ok(())
    }

    /// Enter the function, bumping the shared entry counter.
    ///
    /// Past the warn threshold a diagnostic is logged; past the abort
    /// threshold the call fails with "stack too deep" without executing.
    /// The returned guard decrements on every exit path.
    pub fn enter(&self, config: &RuntimeConfig, line: usize) -> Result<RecursionGuard, RuntimeError> {
        let depth = self.depth.get() + 1;
        self.depth.set(depth);

        if depth > config.recursion_abort_depth {
            // Roll back before failing so the counter stays balanced
            self.depth.set(depth - 1);
            return Err(RuntimeError::StackTooDeep {
                name: self.name.clone(),
                depth,
                line,
            });
        }
        if depth > config.recursion_warn_depth {
            warn!(function = %self.name, depth, "recursion depth exceeds warn threshold");
        }

        Ok(RecursionGuard {
            depth: self.depth.clone(),
        })
    }
}

/// Decrements the shared entry counter when dropped, including on error
/// unwinding out of the body.
#[derive(Debug)]
pub struct RecursionGuard {
    depth: Rc<Cell<usize>>,
}

impl Drop for RecursionGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}
