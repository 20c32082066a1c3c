//! Bound program tree
//!
//! The external parser emits a JSON tree; binding turns it into these typed
//! nodes. Every node carries its 1-indexed source line. Nodes that can
//! participate in a suspension (loops and suspend statements) additionally
//! carry a stable `node_id` assigned during binding, `<kind>:<ordinal>`, so
//! resume points and resume contexts survive re-binding of the same program.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/* ===================== Statements ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stmt {
    Expr {
        expr: Expr,
        #[serde(default)]
        line: usize,
    },
    Assign {
        target: String,
        expr: Expr,
        #[serde(default)]
        line: usize,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        #[serde(default)]
        else_body: Vec<Stmt>,
        #[serde(default)]
        line: usize,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        node_id: String,
        #[serde(default)]
        line: usize,
    },
    For {
        var: String,
        iter: Expr,
        body: Vec<Stmt>,
        node_id: String,
        #[serde(default)]
        line: usize,
    },
    FuncDef {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
        #[serde(default)]
        line: usize,
    },
    Return {
        #[serde(default)]
        value: Option<Expr>,
        #[serde(default)]
        line: usize,
    },
    Break {
        #[serde(default)]
        line: usize,
    },
    Continue {
        #[serde(default)]
        line: usize,
    },
    Try {
        body: Vec<Stmt>,
        catch_var: String,
        catch_body: Vec<Stmt>,
        #[serde(default)]
        line: usize,
    },
    Suspend {
        /// Wait before the next resume attempt, in seconds
        seconds: Expr,
        node_id: String,
        #[serde(default)]
        line: usize,
    },
    Block {
        body: Vec<Stmt>,
        #[serde(default)]
        line: usize,
    },
}

impl Stmt {
    pub fn line(&self) -> usize {
        match self {
            Stmt::Expr { line, .. }
            | Stmt::Assign { line, .. }
            | Stmt::If { line, .. }
            | Stmt::While { line, .. }
            | Stmt::For { line, .. }
            | Stmt::FuncDef { line, .. }
            | Stmt::Return { line, .. }
            | Stmt::Break { line }
            | Stmt::Continue { line }
            | Stmt::Try { line, .. }
            | Stmt::Suspend { line, .. }
            | Stmt::Block { line, .. } => *line,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Stmt::Expr { .. } => "expr",
            Stmt::Assign { .. } => "assign",
            Stmt::If { .. } => "if",
            Stmt::While { .. } => "while",
            Stmt::For { .. } => "for",
            Stmt::FuncDef { .. } => "func_def",
            Stmt::Return { .. } => "return",
            Stmt::Break { .. } => "break",
            Stmt::Continue { .. } => "continue",
            Stmt::Try { .. } => "try",
            Stmt::Suspend { .. } => "suspend",
            Stmt::Block { .. } => "block",
        }
    }
}

/* ===================== Expressions ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    Literal {
        value: Value,
        #[serde(default)]
        line: usize,
    },
    /// Identifier reference; dotted names descend into maps and objects
    Var {
        name: String,
        #[serde(default)]
        line: usize,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        #[serde(default)]
        line: usize,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
        #[serde(default)]
        line: usize,
    },
    /// Call by (possibly dotted) name: user function or builtin
    Call {
        name: String,
        args: Vec<Expr>,
        #[serde(default)]
        line: usize,
    },
    List {
        items: Vec<Expr>,
        #[serde(default)]
        line: usize,
    },
    Map {
        entries: Vec<(String, Expr)>,
        #[serde(default)]
        line: usize,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
        #[serde(default)]
        line: usize,
    },
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal { line, .. }
            | Expr::Var { line, .. }
            | Expr::Binary { line, .. }
            | Expr::Unary { line, .. }
            | Expr::Call { line, .. }
            | Expr::List { line, .. }
            | Expr::Map { line, .. }
            | Expr::Index { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnOp {
    Not,
    Neg,
}
