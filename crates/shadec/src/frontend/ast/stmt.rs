//! Statement nodes

use super::{Expr, VarDecl};
use crate::common::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// expr;
    Expr(Expr),

    /// ;
    Empty,

    /// Local variable declaration
    Decl(VarDecl),

    /// { ... }
    Block(Block),

    If {
        test: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        test: Expr,
        body: Box<Stmt>,
    },

    /// for (init; test; step) body
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },

    Switch {
        value: Expr,
        arms: Vec<SwitchArm>,
    },

    Break,
    Continue,
    Return(Option<Expr>),
}

/// Brace-delimited statement list with its own scope
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Expr(Expr),
    Decl(VarDecl),
}

/// `case <label>:` or `default:` followed by its statements
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchArm {
    /// `None` for the default arm
    pub label: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl SwitchArm {
    pub fn is_default(&self) -> bool {
        self.label.is_none()
    }
}
