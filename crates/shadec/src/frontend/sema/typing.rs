//! Expression typing
//!
//! The typing rules are plain functions over operand types so the checker
//! (which also reports) and [`type_of`] (which only computes) agree. A
//! `None` from a rule means the operands are incompatible; [`type_of`] turns
//! that into `error`.

use super::scope::{SymbolKind, SymbolTable};
use crate::frontend::ast::{AssignOp, BinaryOp, Expr, ExprKind, OpClass, UnaryOp};
use crate::types::{swizzle, Type};

pub(crate) fn binary_type(op: BinaryOp, left: &Type, right: &Type) -> Option<Type> {
    match op.class() {
        OpClass::Arithmetic => left.arithmetic_result(right),
        OpClass::Relational | OpClass::Equality => {
            if left.is_error() || right.is_error() {
                return Some(Type::Error);
            }
            // Arrays and void values have no comparison to lower to
            if !comparable(left) || !comparable(right) {
                return None;
            }
            // One direction only: `i < f` is accepted, `f < i` is not
            left.is_convertible_to(right).then(|| comparison_result(left, right))
        }
        OpClass::Logical => {
            let boolish = |t: &Type| t.is_bool() || t.is_error();
            (boolish(left) && boolish(right)).then_some(Type::Bool)
        }
    }
}

fn comparable(ty: &Type) -> bool {
    !ty.is_array() && !ty.is_void()
}

fn comparison_result(left: &Type, right: &Type) -> Type {
    if left.is_equivalent_to(right) {
        Type::Bool
    } else {
        Type::Error
    }
}

pub(crate) fn unary_type(op: UnaryOp, operand: &Type) -> Option<Type> {
    match op {
        UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Inc | UnaryOp::Dec => postfix_type(operand),
        UnaryOp::Not => {
            if operand.is_error() {
                Some(Type::Error)
            } else {
                operand.is_bool().then_some(Type::Bool)
            }
        }
    }
}

pub(crate) fn postfix_type(operand: &Type) -> Option<Type> {
    (operand.is_arithmetic() || operand.is_error()).then(|| operand.clone())
}

pub(crate) fn assign_type(op: AssignOp, target: &Type, value: &Type) -> Option<Type> {
    match op.binary_op() {
        None => {
            if !value.is_convertible_to(target) {
                return None;
            }
            if target.is_equivalent_to(value) {
                Some(target.clone())
            } else {
                Some(Type::Error)
            }
        }
        Some(_) => match target.arithmetic_result(value) {
            Some(Type::Error) => Some(Type::Error),
            Some(result) if result == *target => Some(result),
            _ => None,
        },
    }
}

pub(crate) fn conditional_type(then_ty: &Type, else_ty: &Type) -> Option<Type> {
    then_ty.common_type(else_ty)
}

pub(crate) fn array_access_type(base: &Type) -> Option<Type> {
    match base {
        Type::Error => Some(Type::Error),
        Type::Array { elem, .. } => Some((**elem).clone()),
        _ => None,
    }
}

pub(crate) fn constructor_type(target: &Type, args: &[Type]) -> Option<Type> {
    target.constructible_from(args).then(|| target.clone())
}

/// Type of a variable reference, if `name` resolves to a variable
pub(crate) fn variable_type(name: &str, symbols: &SymbolTable) -> Option<Type> {
    symbols
        .lookup(name)
        .filter(|sym| sym.kind() == SymbolKind::Variable)
        .map(|sym| sym.ty().clone())
}

/// Compute the type of `expr` in the scope described by `symbols`
///
/// Nothing is cached: every call walks the subtree again. Unresolved names
/// and incompatible operands give `error`.
pub fn type_of(expr: &Expr, symbols: &SymbolTable) -> Type {
    match &expr.kind {
        ExprKind::IntConst(_) => Type::Int,
        ExprKind::FloatConst(_) => Type::Float,
        ExprKind::BoolConst(_) => Type::Bool,

        ExprKind::Var(id) => variable_type(&id.name, symbols).unwrap_or(Type::Error),

        ExprKind::Binary { op, left, right } => {
            binary_type(*op, &type_of(left, symbols), &type_of(right, symbols))
                .unwrap_or(Type::Error)
        }

        ExprKind::Unary { op, operand } => {
            unary_type(*op, &type_of(operand, symbols)).unwrap_or(Type::Error)
        }

        ExprKind::Assign { op, target, value } => {
            if let ExprKind::Var(id) = &target.kind {
                if variable_type(&id.name, symbols).is_none() {
                    return Type::Error;
                }
            }
            assign_type(*op, &type_of(target, symbols), &type_of(value, symbols))
                .unwrap_or(Type::Error)
        }

        ExprKind::Postfix { operand, .. } => {
            postfix_type(&type_of(operand, symbols)).unwrap_or(Type::Error)
        }

        ExprKind::Conditional { then_expr, else_expr, .. } => {
            conditional_type(&type_of(then_expr, symbols), &type_of(else_expr, symbols))
                .unwrap_or(Type::Error)
        }

        ExprKind::ArrayAccess { base, .. } => match &base.kind {
            ExprKind::Var(_) => array_access_type(&type_of(base, symbols)).unwrap_or(Type::Error),
            _ => Type::Error,
        },

        ExprKind::FieldAccess { base, field } => {
            swizzle::validate(&type_of(base, symbols), &field.name).ty
        }

        ExprKind::Call { callee, args } => match symbols.lookup(&callee.name).and_then(|s| s.as_func()) {
            Some(func) if func.formals.len() == args.len() => func.return_type.clone(),
            _ => Type::Error,
        },

        ExprKind::Constructor { ty, args } => {
            let arg_types: Vec<Type> = args.iter().map(|a| type_of(a, symbols)).collect();
            constructor_type(ty, &arg_types).unwrap_or(Type::Error)
        }
    }
}
