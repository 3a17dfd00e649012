//! Expression nodes

use super::Identifier;
use crate::common::Span;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Whether the expression names storage that can be written
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Var(_) | ExprKind::FieldAccess { .. } | ExprKind::ArrayAccess { .. }
        )
    }

    /// Value of an integer constant, allowing a leading minus
    pub fn const_int(&self) -> Option<i64> {
        match &self.kind {
            ExprKind::IntConst(n) => Some(*n),
            ExprKind::Unary { op: UnaryOp::Minus, operand } => operand.const_int().map(i64::wrapping_neg),
            ExprKind::Unary { op: UnaryOp::Plus, operand } => operand.const_int(),
            _ => None,
        }
    }

    /// Literal or constructor of literals, usable as a global initializer
    pub fn is_constant(&self) -> bool {
        match &self.kind {
            ExprKind::IntConst(_) | ExprKind::FloatConst(_) | ExprKind::BoolConst(_) => true,
            ExprKind::Unary { op: UnaryOp::Minus | UnaryOp::Plus, operand } => operand.is_constant(),
            ExprKind::Constructor { args, .. } => args.iter().all(Expr::is_constant),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntConst(i64),
    FloatConst(f64),
    BoolConst(bool),

    /// Variable reference
    Var(Identifier),

    /// Arithmetic, relational, equality and logical operators
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Prefix operators: +x, -x, ++x, --x, !x
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// x = y, x += y, ...
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// x++, x--
    Postfix {
        op: PostfixOp,
        operand: Box<Expr>,
    },

    /// test ? a : b
    Conditional {
        test: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    /// a[i]
    ArrayAccess {
        base: Box<Expr>,
        index: Box<Expr>,
    },

    /// v.xyz
    FieldAccess {
        base: Box<Expr>,
        field: Identifier,
    },

    /// f(a, b)
    Call {
        callee: Identifier,
        args: Vec<Expr>,
    },

    /// vec3(a, b, c), mat2(1.0)
    Constructor {
        ty: Type,
        args: Vec<Expr>,
    },
}

/// Which checking rule a binary operator falls under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    Arithmetic,
    Relational,
    Equality,
    Logical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn class(self) -> OpClass {
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => OpClass::Arithmetic,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => OpClass::Relational,
            BinaryOp::Eq | BinaryOp::Ne => OpClass::Equality,
            BinaryOp::And | BinaryOp::Or => OpClass::Logical,
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Inc,
    Dec,
    Not,
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Inc => "++",
            UnaryOp::Dec => "--",
            UnaryOp::Not => "!",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl AssignOp {
    /// Arithmetic operator applied before storing, if any
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
        }
    }
}

impl std::fmt::Display for AssignOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Inc,
    Dec,
}

impl std::fmt::Display for PostfixOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostfixOp::Inc => write!(f, "++"),
            PostfixOp::Dec => write!(f, "--"),
        }
    }
}
