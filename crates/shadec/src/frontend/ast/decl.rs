//! Declaration nodes

use super::{Block, Expr, Identifier};
use crate::common::Span;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
}

impl Decl {
    pub fn new(kind: DeclKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn name(&self) -> &Identifier {
        match &self.kind {
            DeclKind::Var(var) => &var.name,
            DeclKind::Func(func) => &func.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Var(VarDecl),
    Func(FnDecl),
}

/// Storage qualifier written in front of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeQualifier {
    In,
    Out,
    Const,
    Uniform,
}

impl std::fmt::Display for TypeQualifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeQualifier::In => write!(f, "in"),
            TypeQualifier::Out => write!(f, "out"),
            TypeQualifier::Const => write!(f, "const"),
            TypeQualifier::Uniform => write!(f, "uniform"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: Identifier,
    pub ty: Type,
    pub qualifier: Option<TypeQualifier>,
    pub init: Option<Expr>,
    pub span: Span,
}

impl VarDecl {
    pub fn new(name: Identifier, ty: Type, span: Span) -> Self {
        Self {
            name,
            ty,
            qualifier: None,
            init: None,
            span,
        }
    }

    pub fn with_qualifier(mut self, qualifier: TypeQualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    pub fn with_init(mut self, init: Expr) -> Self {
        self.init = Some(init);
        self
    }

    pub fn is_const(&self) -> bool {
        self.qualifier == Some(TypeQualifier::Const)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: Identifier,
    pub return_type: Type,
    pub formals: Vec<VarDecl>,
    pub body: Block,
    pub span: Span,
}

impl FnDecl {
    pub fn new(name: Identifier, return_type: Type, formals: Vec<VarDecl>, body: Block, span: Span) -> Self {
        Self {
            name,
            return_type,
            formals,
            body,
            span,
        }
    }
}
