//! Binding: external parser JSON trees to the typed program tree
//!
//! The parser emits `{"type": "...", "line": N, ...}` nodes. Binding walks
//! the tree, checks each node's shape, and assigns stable ids to suspendable
//! nodes (`<kind>:<ordinal>`, in tree order, so re-binding the same program
//! reproduces the same ids). A node the binder does not recognize raises a
//! `ParseError` carrying the failing line and token; when the original
//! source text is supplied, the error also carries a rendered excerpt.

use crate::engine::ast::{BinOp, Expr, Stmt, UnOp};
use crate::errors::ParseError;
use crate::value::from_native;
use serde_json::Value as Json;
use std::collections::HashMap;

/* ===================== Entry Point ===================== */

/// Bind a parser tree (an array of statement nodes) to typed statements.
pub fn bind(program: &Json, source: Option<&str>) -> Result<Vec<Stmt>, ParseError> {
    let mut binder = Binder {
        source,
        ordinals: HashMap::new(),
    };
    binder.bind_body(program)
}

struct Binder<'a> {
    source: Option<&'a str>,
    /// Next ordinal per suspendable node kind
    ordinals: HashMap<&'static str, usize>,
}

impl<'a> Binder<'a> {
    fn next_id(&mut self, kind: &'static str) -> String {
        let ordinal = self.ordinals.entry(kind).or_insert(0);
        let id = format!("{}:{}", kind, ordinal);
        *ordinal += 1;
        id
    }

    fn fail(&self, message: impl Into<String>, token: &str, node: &Json) -> ParseError {
        let line = node_line(node);
        let err = ParseError::new(message, token, line);
        match self.source {
            Some(source) => {
                let column = node
                    .get("column")
                    .and_then(Json::as_u64)
                    .unwrap_or(1) as usize;
                err.with_source(source, column, token.len())
            }
            None => err,
        }
    }

    /* ----- statements ----- */

    fn bind_body(&mut self, body: &Json) -> Result<Vec<Stmt>, ParseError> {
        let nodes = body
            .as_array()
            .ok_or_else(|| self.fail("expected a statement list", "body", body))?;
        nodes.iter().map(|n| self.bind_stmt(n)).collect()
    }

    fn bind_stmt(&mut self, node: &Json) -> Result<Stmt, ParseError> {
        let kind = node
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| self.fail("statement node has no type", "?", node))?
            .to_string();
        let line = node_line(node);

        match kind.as_str() {
            "expr" => Ok(Stmt::Expr {
                expr: self.bind_expr(self.field(node, &kind, "expr")?)?,
                line,
            }),
            "assign" => Ok(Stmt::Assign {
                target: self.str_field(node, &kind, "target")?,
                expr: self.bind_expr(self.field(node, &kind, "expr")?)?,
                line,
            }),
            "if" => Ok(Stmt::If {
                cond: self.bind_expr(self.field(node, &kind, "cond")?)?,
                then_body: self.bind_body(self.field(node, &kind, "then_body")?)?,
                else_body: match node.get("else_body") {
                    Some(b) => self.bind_body(b)?,
                    None => vec![],
                },
                line,
            }),
            "while" => {
                let node_id = self.next_id("while");
                Ok(Stmt::While {
                    cond: self.bind_expr(self.field(node, &kind, "cond")?)?,
                    body: self.bind_body(self.field(node, &kind, "body")?)?,
                    node_id,
                    line,
                })
            }
            "for" => {
                let node_id = self.next_id("for");
                Ok(Stmt::For {
                    var: self.str_field(node, &kind, "var")?,
                    iter: self.bind_expr(self.field(node, &kind, "iter")?)?,
                    body: self.bind_body(self.field(node, &kind, "body")?)?,
                    node_id,
                    line,
                })
            }
            "func_def" => {
                let params = self
                    .field(node, &kind, "params")?
                    .as_array()
                    .ok_or_else(|| self.fail("params must be a list of names", &kind, node))?
                    .iter()
                    .map(|p| {
                        p.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| self.fail("params must be a list of names", &kind, node))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Stmt::FuncDef {
                    name: self.str_field(node, &kind, "name")?,
                    params,
                    body: self.bind_body(self.field(node, &kind, "body")?)?,
                    line,
                })
            }
            "return" => Ok(Stmt::Return {
                value: match node.get("value") {
                    Some(Json::Null) | None => None,
                    Some(v) => Some(self.bind_expr(v)?),
                },
                line,
            }),
            "break" => Ok(Stmt::Break { line }),
            "continue" => Ok(Stmt::Continue { line }),
            "try" => Ok(Stmt::Try {
                body: self.bind_body(self.field(node, &kind, "body")?)?,
                catch_var: self.str_field(node, &kind, "catch_var")?,
                catch_body: self.bind_body(self.field(node, &kind, "catch_body")?)?,
                line,
            }),
            "suspend" => {
                let node_id = self.next_id("suspend");
                Ok(Stmt::Suspend {
                    seconds: self.bind_expr(self.field(node, &kind, "seconds")?)?,
                    node_id,
                    line,
                })
            }
            "block" => Ok(Stmt::Block {
                body: self.bind_body(self.field(node, &kind, "body")?)?,
                line,
            }),
            other => Err(self.fail(
                format!("unrecognized statement node '{}'", other),
                other,
                node,
            )),
        }
    }

    /* ----- expressions ----- */

    fn bind_expr(&mut self, node: &Json) -> Result<Expr, ParseError> {
        let kind = node
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| self.fail("expression node has no type", "?", node))?
            .to_string();
        let line = node_line(node);

        match kind.as_str() {
            "literal" => Ok(Expr::Literal {
                value: from_native(self.field(node, &kind, "value")?),
                line,
            }),
            "var" => Ok(Expr::Var {
                name: self.str_field(node, &kind, "name")?,
                line,
            }),
            "binary" => Ok(Expr::Binary {
                op: self.bind_binop(node)?,
                left: Box::new(self.bind_expr(self.field(node, &kind, "left")?)?),
                right: Box::new(self.bind_expr(self.field(node, &kind, "right")?)?),
                line,
            }),
            "unary" => {
                let op = match self.str_field(node, &kind, "op")?.as_str() {
                    "not" => UnOp::Not,
                    "neg" => UnOp::Neg,
                    other => {
                        return Err(self.fail(
                            format!("unrecognized unary operator '{}'", other),
                            other,
                            node,
                        ))
                    }
                };
                Ok(Expr::Unary {
                    op,
                    expr: Box::new(self.bind_expr(self.field(node, &kind, "expr")?)?),
                    line,
                })
            }
            "call" => {
                let args = self
                    .field(node, &kind, "args")?
                    .as_array()
                    .ok_or_else(|| self.fail("call args must be a list", &kind, node))?
                    .iter()
                    .map(|a| self.bind_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Call {
                    name: self.str_field(node, &kind, "name")?,
                    args,
                    line,
                })
            }
            "list" => {
                let items = self
                    .field(node, &kind, "items")?
                    .as_array()
                    .ok_or_else(|| self.fail("list items must be a list", &kind, node))?
                    .iter()
                    .map(|i| self.bind_expr(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::List { items, line })
            }
            "map" => {
                let entries = self
                    .field(node, &kind, "entries")?
                    .as_object()
                    .ok_or_else(|| self.fail("map entries must be an object", &kind, node))?
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.bind_expr(v)?)))
                    .collect::<Result<Vec<_>, ParseError>>()?;
                Ok(Expr::Map { entries, line })
            }
            "index" => Ok(Expr::Index {
                target: Box::new(self.bind_expr(self.field(node, &kind, "target")?)?),
                index: Box::new(self.bind_expr(self.field(node, &kind, "index")?)?),
                line,
            }),
            other => Err(self.fail(
                format!("unrecognized expression node '{}'", other),
                other,
                node,
            )),
        }
    }

    fn bind_binop(&self, node: &Json) -> Result<BinOp, ParseError> {
        let op = self.str_field(node, "binary", "op")?;
        Ok(match op.as_str() {
            "add" => BinOp::Add,
            "sub" => BinOp::Sub,
            "mul" => BinOp::Mul,
            "div" => BinOp::Div,
            "mod" => BinOp::Mod,
            "eq" => BinOp::Eq,
            "ne" => BinOp::Ne,
            "lt" => BinOp::Lt,
            "le" => BinOp::Le,
            "gt" => BinOp::Gt,
            "ge" => BinOp::Ge,
            "and" => BinOp::And,
            "or" => BinOp::Or,
            other => {
                return Err(self.fail(
                    format!("unrecognized binary operator '{}'", other),
                    other,
                    node,
                ))
            }
        })
    }

    /* ----- field access ----- */

    fn field<'n>(&self, node: &'n Json, kind: &str, name: &str) -> Result<&'n Json, ParseError> {
        node.get(name)
            .ok_or_else(|| self.fail(format!("{} node missing '{}'", kind, name), kind, node))
    }

    fn str_field(&self, node: &Json, kind: &str, name: &str) -> Result<String, ParseError> {
        self.field(node, kind, name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.fail(format!("{} '{}' must be a string", kind, name), kind, node))
    }
}

fn node_line(node: &Json) -> usize {
    node.get("line").and_then(Json::as_u64).unwrap_or(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binds_assign_and_return() {
        let program = json!([
            {"type": "assign", "target": "a", "line": 1,
             "expr": {"type": "literal", "value": 1, "line": 1}},
            {"type": "return", "line": 2,
             "value": {"type": "var", "name": "a", "line": 2}}
        ]);

        let stmts = bind(&program, None).unwrap();
        assert_eq!(stmts.len(), 2);
        assert!(matches!(&stmts[0], Stmt::Assign { target, .. } if target == "a"));
        assert!(matches!(&stmts[1], Stmt::Return { value: Some(_), .. }));
    }

    #[test]
    fn test_node_ids_are_stable_across_rebinding() {
        let program = json!([
            {"type": "while", "line": 1,
             "cond": {"type": "literal", "value": true},
             "body": [
                {"type": "suspend", "line": 2, "seconds": {"type": "literal", "value": 5}}
             ]},
            {"type": "suspend", "line": 4, "seconds": {"type": "literal", "value": 5}}
        ]);

        let first = bind(&program, None).unwrap();
        let second = bind(&program, None).unwrap();
        assert_eq!(first, second);

        let Stmt::While { node_id, body, .. } = &first[0] else {
            panic!("expected while");
        };
        assert_eq!(node_id, "while:0");
        let Stmt::Suspend { node_id, .. } = &body[0] else {
            panic!("expected suspend");
        };
        assert_eq!(node_id, "suspend:0");
        let Stmt::Suspend { node_id, .. } = &first[1] else {
            panic!("expected suspend");
        };
        assert_eq!(node_id, "suspend:1");
    }

    #[test]
    fn test_unrecognized_node_renders_context() {
        let source = "a = 1\nwat 2\nb = 3\n";
        let program = json!([
            {"type": "wat", "line": 2, "column": 1}
        ]);

        let err = bind(&program, Some(source)).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.token, "wat");
        assert!(err.context.contains("2 | wat 2"));
        assert!(err.context.contains("^^^"));
    }

    #[test]
    fn test_missing_field_fails() {
        let program = json!([{"type": "assign", "line": 3, "target": "a"}]);
        let err = bind(&program, None).unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("missing 'expr'"));
    }
}
