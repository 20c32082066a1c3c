//! Lexical scope chain
//!
//! A `Scope` maps identifiers to values and points at a parent. Four flavors
//! exist:
//! - `Constant`: assign-once bindings shared across runs (builtins, host
//!   constants). Re-assigning an already-bound name here is an error.
//! - `Global`: the per-run top-level scope (ENV, PROPS, injected variables).
//! - `Isolated`: created per function call; shares the global/constant
//!   ancestry of its seed but none of its local bindings, so nested and
//!   recursive invocations cannot see each other's locals.
//! - `Block`: nested statement blocks.
//!
//! `resolve` never fails on a miss: it returns `None` and leaves the error
//! decision to the caller. `assign` re-binds at the owning scope when the
//! name already resolves, and otherwise creates a binding in the current
//! scope; a dotted name with no existing root performs auto-vivifying map
//! assignment.

use crate::errors::RuntimeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/* ===================== Scope ===================== */

pub type ScopeRef = Rc<RefCell<Scope>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Constant,
    Global,
    Isolated,
    Block,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    vars: HashMap<String, Value>,
    parent: Option<ScopeRef>,
}

impl Scope {
    pub fn constant() -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            kind: ScopeKind::Constant,
            vars: HashMap::new(),
            parent: None,
        }))
    }

    pub fn global(parent: ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            kind: ScopeKind::Global,
            vars: HashMap::new(),
            parent: Some(parent),
        }))
    }

    pub fn block(parent: ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            kind: ScopeKind::Block,
            vars: HashMap::new(),
            parent: Some(parent),
        }))
    }

    /// Bind `name` directly in this scope, bypassing owner lookup.
    ///
    /// Used for seeding (builtins, ENV/PROPS, call arguments). In a constant
    /// scope this is the one permitted assignment per name.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }
}

/* ===================== Chain Operations ===================== */

/// Search the current scope, then walk parents. `None` means unbound,
/// never an error.
pub fn resolve(scope: &ScopeRef, name: &str) -> Option<Value> {
    let mut current = Some(scope.clone());
    while let Some(s) = current {
        let borrowed = s.borrow();
        if let Some(v) = borrowed.vars.get(name) {
            return Some(v.clone());
        }
        current = borrowed.parent.clone();
    }
    None
}

/// Find the scope that owns `name`, walking from `scope` upward.
fn find_owner(scope: &ScopeRef, name: &str) -> Option<ScopeRef> {
    let mut current = Some(scope.clone());
    while let Some(s) = current {
        if s.borrow().contains(name) {
            return Some(s);
        }
        let parent = s.borrow().parent.clone();
        current = parent;
    }
    None
}

/// Assign `name` in the chain rooted at `scope`.
///
/// - An already-resolved name is re-bound at its owning scope; a constant
///   owner rejects the second assignment.
/// - An unbound dotted name performs dotted assignment.
/// - An unbound plain name creates a binding in the current scope.
pub fn assign(scope: &ScopeRef, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
    if let Some(owner) = find_owner(scope, name) {
        let mut borrowed = owner.borrow_mut();
        if borrowed.kind == ScopeKind::Constant {
            return Err(RuntimeError::ConstantAssignment {
                name: name.to_string(),
                line,
            });
        }
        borrowed.define(name, value);
        return Ok(());
    }

    if name.contains('.') {
        return assign_dotted(scope, name, value, line);
    }

    scope.borrow_mut().define(name, value);
    Ok(())
}

/// Dotted assignment `a.b.c = v`: resolve or create the root as a map,
/// descend creating intermediate maps, set the leaf. A non-map segment on
/// the way is fatal.
fn assign_dotted(
    scope: &ScopeRef,
    path: &str,
    value: Value,
    line: usize,
) -> Result<(), RuntimeError> {
    let segments: Vec<&str> = path.split('.').collect();
    let root = segments[0];

    // The scope that will hold the root map: its owner if bound, else here
    let target = find_owner(scope, root).unwrap_or_else(|| scope.clone());
    let mut borrowed = target.borrow_mut();
    if borrowed.kind == ScopeKind::Constant && borrowed.contains(root) {
        return Err(RuntimeError::ConstantAssignment {
            name: root.to_string(),
            line,
        });
    }

    let root_value = borrowed
        .vars
        .entry(root.to_string())
        .or_insert_with(|| Value::Map(HashMap::new()));

    let mut current = match root_value {
        Value::Map(m) => m,
        _ => {
            return Err(RuntimeError::BadAssignTarget {
                segment: root.to_string(),
                line,
            })
        }
    };

    for segment in &segments[1..segments.len() - 1] {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Map(HashMap::new()));
        current = match entry {
            Value::Map(m) => m,
            _ => {
                return Err(RuntimeError::BadAssignTarget {
                    segment: segment.to_string(),
                    line,
                })
            }
        };
    }

    let leaf = segments[segments.len() - 1];
    current.insert(leaf.to_string(), value);
    Ok(())
}

/// All bindings visible from `scope`, flattened into one map. Inner
/// bindings shadow outer ones; the constant scope is excluded so the
/// result is safe to re-assign wholesale. Loops snapshot this at iteration
/// entry to restore loop-carried state on resume.
pub fn flatten(scope: &ScopeRef) -> HashMap<String, Value> {
    let mut layers = Vec::new();
    let mut current = Some(scope.clone());
    while let Some(s) = current {
        let borrowed = s.borrow();
        if borrowed.kind != ScopeKind::Constant {
            layers.push(borrowed.vars.clone());
        }
        current = borrowed.parent.clone();
    }

    let mut out = HashMap::new();
    for layer in layers.into_iter().rev() {
        out.extend(layer);
    }
    out
}

/// New scope sharing `seed`'s global/constant ancestry but none of its
/// local bindings. One per function call.
pub fn isolated(seed: &ScopeRef) -> ScopeRef {
    let mut current = seed.clone();
    loop {
        let kind = current.borrow().kind;
        if kind == ScopeKind::Global || kind == ScopeKind::Constant {
            break;
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => break,
        }
    }

    Rc::new(RefCell::new(Scope {
        kind: ScopeKind::Isolated,
        vars: HashMap::new(),
        parent: Some(current),
    }))
}

/// Shallow copy: same parent, cloned local bindings. Used when a function
/// scope could be concurrently in flight (recursive self-calls) so
/// invocations sharing one closure do not cross-talk.
pub fn shallow_copy(scope: &ScopeRef) -> ScopeRef {
    let borrowed = scope.borrow();
    Rc::new(RefCell::new(Scope {
        kind: borrowed.kind,
        vars: borrowed.vars.clone(),
        parent: borrowed.parent.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ScopeRef {
        let constant = Scope::constant();
        Scope::global(constant)
    }

    #[test]
    fn test_resolve_miss_is_none() {
        let scope = chain();
        assert_eq!(resolve(&scope, "nothing"), None);
    }

    #[test]
    fn test_assign_rebinds_at_owner() {
        let global = chain();
        assign(&global, "a", Value::Num(1.0), 0).unwrap();

        let block = Scope::block(global.clone());
        assign(&block, "a", Value::Num(2.0), 0).unwrap();

        // The rebind happened in the global scope, not the block
        assert_eq!(resolve(&global, "a"), Some(Value::Num(2.0)));
        assert!(!block.borrow().contains("a"));
    }

    #[test]
    fn test_constant_rejects_second_assignment() {
        let constant = Scope::constant();
        constant.borrow_mut().define("PI", Value::Num(3.14));
        let global = Scope::global(constant);

        let err = assign(&global, "PI", Value::Num(3.0), 7).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::ConstantAssignment {
                name: "PI".to_string(),
                line: 7
            }
        );
    }

    #[test]
    fn test_dotted_assignment_creates_maps() {
        let scope = chain();
        assign(&scope, "a.b.c", Value::Num(5.0), 0).unwrap();

        let Some(Value::Map(a)) = resolve(&scope, "a") else {
            panic!("expected a to be a map");
        };
        let Some(Value::Map(b)) = a.get("b").cloned() else {
            panic!("expected a.b to be a map");
        };
        assert_eq!(b.get("c"), Some(&Value::Num(5.0)));
    }

    #[test]
    fn test_dotted_assignment_updates_in_place() {
        let scope = chain();
        assign(&scope, "a.b.c", Value::Num(5.0), 0).unwrap();
        assign(&scope, "a.b.c", Value::Num(9.0), 0).unwrap();
        assign(&scope, "a.b.d", Value::Num(1.0), 0).unwrap();

        let Some(Value::Map(a)) = resolve(&scope, "a") else {
            panic!("expected a to be a map");
        };
        let Some(Value::Map(b)) = a.get("b").cloned() else {
            panic!("expected a.b to be a map");
        };
        // Single structure, updated leaf, second leaf alongside
        assert_eq!(b.get("c"), Some(&Value::Num(9.0)));
        assert_eq!(b.get("d"), Some(&Value::Num(1.0)));
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_dotted_assignment_non_map_intermediate_fails() {
        let scope = chain();
        assign(&scope, "a", Value::Str("text".to_string()), 0).unwrap();

        let err = assign(&scope, "a.b", Value::Num(1.0), 3).unwrap_err();
        assert!(matches!(err, RuntimeError::BadAssignTarget { .. }));
    }

    #[test]
    fn test_isolated_scope_hides_locals() {
        let global = chain();
        assign(&global, "shared", Value::Num(1.0), 0).unwrap();

        let call_scope = Scope::block(global.clone());
        assign(&call_scope, "local_only", Value::Num(2.0), 0).unwrap();

        let iso = isolated(&call_scope);
        assert_eq!(resolve(&iso, "shared"), Some(Value::Num(1.0)));
        assert_eq!(resolve(&iso, "local_only"), None);
    }

    #[test]
    fn test_flatten_shadows_and_skips_constants() {
        let constant = Scope::constant();
        constant.borrow_mut().define("print", Value::Num(0.0));
        let global = Scope::global(constant);
        assign(&global, "a", Value::Num(1.0), 0).unwrap();
        assign(&global, "b", Value::Num(2.0), 0).unwrap();

        let block = Scope::block(global);
        block.borrow_mut().define("b", Value::Num(20.0));

        let flat = flatten(&block);
        assert_eq!(flat.get("a"), Some(&Value::Num(1.0)));
        assert_eq!(flat.get("b"), Some(&Value::Num(20.0)));
        assert!(!flat.contains_key("print"));
    }

    #[test]
    fn test_shallow_copy_isolates_rebinding() {
        let global = chain();
        let call = Scope::block(global);
        assign(&call, "n", Value::Num(1.0), 0).unwrap();

        let copy = shallow_copy(&call);
        copy.borrow_mut().define("n", Value::Num(99.0));

        assert_eq!(resolve(&call, "n"), Some(Value::Num(1.0)));
        assert_eq!(resolve(&copy, "n"), Some(Value::Num(99.0)));
    }
}
