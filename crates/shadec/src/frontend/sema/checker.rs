//! Type and semantic checker
//!
//! Walks the whole program once, maintaining its own symbol table, and
//! reports every problem it finds. Ill-typed subtrees get the `error` type,
//! which their consumers accept silently.

use std::collections::HashSet;

use tracing::{debug, instrument};

use super::diagnostics::{Diagnostic, LookingFor, Reporter, SemanticError};
use super::scope::{Symbol, SymbolKind, SymbolTable};
use super::typing::{
    array_access_type, assign_type, binary_type, conditional_type, constructor_type, postfix_type,
    unary_type, variable_type,
};
use crate::common::Span;
use crate::frontend::ast::*;
use crate::types::{swizzle, SwizzleIssue, Type};

/// A program that passed checking without diagnostics
///
/// Only [`check`] creates one, so holding it is proof the tree is safe to
/// lower. Subtrees the checker typed `error` without a diagnostic, such as
/// `i < 2.0`, are still inside it; the code generator lowers every value
/// type to every other.
#[derive(Debug, Clone, Copy)]
pub struct CheckedProgram<'ast> {
    program: &'ast Program,
}

impl<'ast> CheckedProgram<'ast> {
    pub fn program(&self) -> &'ast Program {
        self.program
    }
}

/// Check `program`, delivering each diagnostic to `reporter`
///
/// Returns the checked program when nothing was reported.
#[instrument(skip_all, fields(decls = program.decls.len()))]
pub fn check<'ast>(program: &'ast Program, reporter: &mut dyn Reporter) -> Option<CheckedProgram<'ast>> {
    let mut checker = Checker::new(reporter);
    checker.check_program(program);
    let errors = checker.error_count();
    debug!(errors, "check finished");
    (errors == 0).then_some(CheckedProgram { program })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Loop,
    Switch,
}

pub struct Checker<'ast, 'r> {
    symbols: SymbolTable<'ast>,
    reporter: &'r mut dyn Reporter,
    return_type: Option<Type>,
    frames: Vec<FrameKind>,
    errors: usize,
}

impl<'ast, 'r> Checker<'ast, 'r> {
    pub fn new(reporter: &'r mut dyn Reporter) -> Self {
        Self {
            symbols: SymbolTable::new(),
            reporter,
            return_type: None,
            frames: Vec::new(),
            errors: 0,
        }
    }

    /// Number of diagnostics reported so far
    pub fn error_count(&self) -> usize {
        self.errors
    }

    fn report(&mut self, error: SemanticError, span: Span) {
        self.errors += 1;
        self.reporter.report(Diagnostic::new(error, span));
    }

    fn declare(&mut self, symbol: Symbol<'ast>) {
        let name = symbol.name.clone();
        let span = symbol.span();
        if let Some(previous) = self.symbols.declare(symbol) {
            self.report(
                SemanticError::DeclConflict {
                    name,
                    previous: previous.span(),
                },
                span,
            );
        }
    }

    pub fn check_program(&mut self, program: &'ast Program) {
        for decl in &program.decls {
            match &decl.kind {
                DeclKind::Var(var) => self.check_var_decl(var),
                DeclKind::Func(func) => self.check_function(func),
            }
        }
    }

    fn check_var_decl(&mut self, var: &'ast VarDecl) {
        if var.ty.is_void() {
            self.report(
                SemanticError::VoidVariable {
                    name: var.name.name.clone(),
                },
                var.name.span,
            );
        }

        // The initializer cannot see the variable it initializes
        if let Some(init) = &var.init {
            let found = self.check_expr(init);
            if self.symbols.is_global_scope() && !init.is_constant() {
                self.report(
                    SemanticError::NonConstantInitializer {
                        name: var.name.name.clone(),
                    },
                    init.span,
                );
            } else if !found.is_convertible_to(&var.ty) {
                self.report(
                    SemanticError::InvalidInitialization {
                        name: var.name.name.clone(),
                        declared: var.ty.clone(),
                        found,
                    },
                    init.span,
                );
            }
        }

        self.declare(Symbol::variable(var));
    }

    fn check_function(&mut self, func: &'ast FnDecl) {
        debug!(name = %func.name, "checking function");
        self.declare(Symbol::function(func));

        self.symbols.push();
        for formal in &func.formals {
            self.check_var_decl(formal);
        }

        let outer_return = self.return_type.replace(func.return_type.clone());
        let outer_frames = std::mem::take(&mut self.frames);
        self.check_block(&func.body);
        self.frames = outer_frames;
        self.return_type = outer_return;

        self.symbols.pop();
    }

    fn check_block(&mut self, block: &'ast Block) {
        self.symbols.push();
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
        self.symbols.pop();
    }

    /// Check `stmt` in a scope of its own
    fn check_scoped(&mut self, stmt: &'ast Stmt) {
        self.symbols.push();
        self.check_stmt(stmt);
        self.symbols.pop();
    }

    fn check_loop_body(&mut self, body: &'ast Stmt) {
        self.frames.push(FrameKind::Loop);
        self.check_scoped(body);
        self.frames.pop();
    }

    fn check_test(&mut self, test: &'ast Expr) {
        let found = self.check_expr(test);
        if !found.is_bool() && !found.is_error() {
            self.report(SemanticError::TestNotBoolean { found }, test.span);
        }
    }

    fn check_stmt(&mut self, stmt: &'ast Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::Empty => {}
            StmtKind::Decl(var) => self.check_var_decl(var),
            StmtKind::Block(block) => self.check_block(block),

            StmtKind::If { test, then_branch, else_branch } => {
                self.check_test(test);
                self.check_scoped(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_scoped(else_branch);
                }
            }

            StmtKind::While { test, body } => {
                self.check_test(test);
                self.check_loop_body(body);
            }

            StmtKind::For { init, test, step, body } => {
                self.symbols.push();
                match init {
                    Some(ForInit::Expr(expr)) => {
                        self.check_expr(expr);
                    }
                    Some(ForInit::Decl(var)) => self.check_var_decl(var),
                    None => {}
                }
                if let Some(test) = test {
                    self.check_test(test);
                }
                if let Some(step) = step {
                    self.check_expr(step);
                }
                self.check_loop_body(body);
                self.symbols.pop();
            }

            StmtKind::Switch { value, arms } => self.check_switch(value, arms),

            StmtKind::Break => {
                if self.frames.is_empty() {
                    self.report(SemanticError::BreakOutsideLoop, stmt.span);
                }
            }

            StmtKind::Continue => {
                if !self.frames.contains(&FrameKind::Loop) {
                    self.report(SemanticError::ContinueOutsideLoop, stmt.span);
                }
            }

            StmtKind::Return(value) => {
                let expected = self.return_type.clone().unwrap_or(Type::Void);
                let found = match value {
                    Some(expr) => self.check_expr(expr),
                    None => Type::Void,
                };
                if !found.is_convertible_to(&expected) {
                    self.report(SemanticError::ReturnMismatch { expected, found }, stmt.span);
                }
            }
        }
    }

    fn check_switch(&mut self, value: &'ast Expr, arms: &'ast [SwitchArm]) {
        let found = self.check_expr(value);
        if !found.is_int() && !found.is_error() {
            self.report(SemanticError::SwitchNotInteger { found }, value.span);
        }

        let mut seen = HashSet::new();
        let mut has_default = false;
        for arm in arms {
            match &arm.label {
                Some(label) => match label.const_int() {
                    Some(n) => {
                        if !seen.insert(n) {
                            self.report(SemanticError::DuplicateCase { value: n }, label.span);
                        }
                    }
                    None => {
                        self.check_expr(label);
                        self.report(SemanticError::NonConstantCaseLabel, label.span);
                    }
                },
                None => {
                    if has_default {
                        self.report(SemanticError::DuplicateDefault, arm.span);
                    }
                    has_default = true;
                }
            }
        }

        self.frames.push(FrameKind::Switch);
        for arm in arms {
            self.symbols.push();
            for stmt in &arm.body {
                self.check_stmt(stmt);
            }
            self.symbols.pop();
        }
        self.frames.pop();
    }

    /// Check `expr` and everything below it, returning its type
    pub fn check_expr(&mut self, expr: &'ast Expr) -> Type {
        match &expr.kind {
            ExprKind::IntConst(_) => Type::Int,
            ExprKind::FloatConst(_) => Type::Float,
            ExprKind::BoolConst(_) => Type::Bool,

            ExprKind::Var(id) => match variable_type(&id.name, &self.symbols) {
                Some(ty) => ty,
                None => {
                    self.report(
                        SemanticError::IdentifierNotDeclared {
                            name: id.name.clone(),
                            looking_for: LookingFor::Variable,
                        },
                        id.span,
                    );
                    Type::Error
                }
            },

            ExprKind::Binary { op, left, right } => {
                let left = self.check_expr(left);
                let right = self.check_expr(right);
                match binary_type(*op, &left, &right) {
                    Some(ty) => ty,
                    None => {
                        self.report(
                            SemanticError::IncompatibleOperands {
                                op: op.to_string(),
                                left,
                                right,
                            },
                            expr.span,
                        );
                        Type::Error
                    }
                }
            }

            ExprKind::Unary { op, operand } => {
                let operand_ty = self.check_expr(operand);
                if matches!(op, UnaryOp::Inc | UnaryOp::Dec) {
                    self.check_lvalue(operand, &op.to_string());
                }
                match unary_type(*op, &operand_ty) {
                    Some(ty) => ty,
                    None => {
                        self.report(
                            SemanticError::IncompatibleOperand {
                                op: op.to_string(),
                                operand: operand_ty,
                            },
                            expr.span,
                        );
                        Type::Error
                    }
                }
            }

            ExprKind::Assign { op, target, value } => {
                let target_ty = self.check_expr(target);
                let value_ty = self.check_expr(value);
                self.check_lvalue(target, &op.to_string());

                if let ExprKind::Var(id) = &target.kind {
                    if variable_type(&id.name, &self.symbols).is_none() {
                        return Type::Error;
                    }
                }
                match assign_type(*op, &target_ty, &value_ty) {
                    Some(ty) => ty,
                    None => {
                        self.report(
                            SemanticError::IncompatibleOperands {
                                op: op.to_string(),
                                left: target_ty,
                                right: value_ty,
                            },
                            expr.span,
                        );
                        Type::Error
                    }
                }
            }

            ExprKind::Postfix { op, operand } => {
                let operand_ty = self.check_expr(operand);
                self.check_lvalue(operand, &op.to_string());
                match postfix_type(&operand_ty) {
                    Some(ty) => ty,
                    None => {
                        self.report(
                            SemanticError::IncompatibleOperand {
                                op: op.to_string(),
                                operand: operand_ty,
                            },
                            expr.span,
                        );
                        Type::Error
                    }
                }
            }

            ExprKind::Conditional { test, then_expr, else_expr } => {
                self.check_test(test);
                let then_ty = self.check_expr(then_expr);
                let else_ty = self.check_expr(else_expr);
                match conditional_type(&then_ty, &else_ty) {
                    Some(ty) => ty,
                    None => {
                        self.report(
                            SemanticError::IncompatibleOperands {
                                op: "?:".to_string(),
                                left: then_ty,
                                right: else_ty,
                            },
                            expr.span,
                        );
                        Type::Error
                    }
                }
            }

            ExprKind::ArrayAccess { base, index } => {
                let base_ty = self.check_expr(base);
                let index_ty = self.check_expr(index);
                if !index_ty.is_int() && !index_ty.is_error() {
                    self.report(SemanticError::SubscriptNotInteger { found: index_ty }, index.span);
                }

                let element = match &base.kind {
                    ExprKind::Var(_) => array_access_type(&base_ty),
                    _ if base_ty.is_error() => Some(Type::Error),
                    _ => None,
                };
                match element {
                    Some(ty) => ty,
                    None => {
                        self.report(SemanticError::NotAnArray { found: base_ty }, base.span);
                        Type::Error
                    }
                }
            }

            ExprKind::FieldAccess { base, field } => {
                let base_ty = self.check_expr(base);
                let check = swizzle::validate(&base_ty, &field.name);
                for issue in &check.issues {
                    let swizzle = field.name.clone();
                    let error = match issue {
                        SwizzleIssue::InvalidLetter => SemanticError::InvalidSwizzle { swizzle },
                        SwizzleIssue::OutOfBound => SemanticError::SwizzleOutOfBound {
                            swizzle,
                            base: base_ty.clone(),
                        },
                        SwizzleIssue::Oversized => SemanticError::OversizedVector { swizzle },
                        SwizzleIssue::NonVectorBase => SemanticError::InaccessibleSwizzle {
                            swizzle,
                            base: base_ty.clone(),
                        },
                    };
                    self.report(error, field.span);
                }
                check.ty
            }

            ExprKind::Call { callee, args } => self.check_call(callee, args),

            ExprKind::Constructor { ty, args } => {
                let arg_types: Vec<Type> = args.iter().map(|arg| self.check_expr(arg)).collect();
                match constructor_type(ty, &arg_types) {
                    Some(ty) => ty,
                    None => {
                        let listed: Vec<String> = arg_types.iter().map(Type::to_string).collect();
                        self.report(
                            SemanticError::InvalidConstructor {
                                target: ty.clone(),
                                args: listed.join(", "),
                            },
                            expr.span,
                        );
                        Type::Error
                    }
                }
            }
        }
    }

    fn check_call(&mut self, callee: &'ast Identifier, args: &'ast [Expr]) -> Type {
        let actuals: Vec<Type> = args.iter().map(|arg| self.check_expr(arg)).collect();

        let symbol = self.symbols.lookup(&callee.name).map(|s| (s.kind(), s.as_func()));
        let func = match symbol {
            None => {
                self.report(
                    SemanticError::IdentifierNotDeclared {
                        name: callee.name.clone(),
                        looking_for: LookingFor::Function,
                    },
                    callee.span,
                );
                return Type::Error;
            }
            Some((SymbolKind::Function, Some(func))) => func,
            Some(_) => {
                self.report(
                    SemanticError::NotAFunction {
                        name: callee.name.clone(),
                    },
                    callee.span,
                );
                return Type::Error;
            }
        };

        let expected = func.formals.len();
        let given = actuals.len();
        if given < expected {
            self.report(
                SemanticError::LessFormals {
                    name: callee.name.clone(),
                    expected,
                    given,
                },
                callee.span,
            );
        } else if given > expected {
            self.report(
                SemanticError::ExtraFormals {
                    name: callee.name.clone(),
                    expected,
                    given,
                },
                callee.span,
            );
        }

        for (index, (formal, actual)) in func.formals.iter().zip(&actuals).enumerate() {
            if !actual.is_convertible_to(&formal.ty) {
                self.report(
                    SemanticError::FormalsTypeMismatch {
                        formal: formal.name.name.clone(),
                        index,
                        expected: formal.ty.clone(),
                        actual: actual.clone(),
                    },
                    args[index].span,
                );
            }
        }

        if given == expected {
            func.return_type.clone()
        } else {
            Type::Error
        }
    }

    /// Report a write to something that is not assignable storage
    fn check_lvalue(&mut self, target: &'ast Expr, op: &str) {
        let root = if target.is_lvalue() { root_variable(target) } else { None };
        let Some(root) = root else {
            self.report(SemanticError::NotAnLvalue { op: op.to_string() }, target.span);
            return;
        };

        let is_const = self
            .symbols
            .lookup(&root.name)
            .and_then(|sym| sym.as_var())
            .is_some_and(VarDecl::is_const);
        if is_const {
            self.report(
                SemanticError::AssignToConst {
                    name: root.name.clone(),
                },
                target.span,
            );
        }
    }
}

/// Variable a chain of swizzles and subscripts is rooted at
fn root_variable(expr: &Expr) -> Option<&Identifier> {
    match &expr.kind {
        ExprKind::Var(id) => Some(id),
        ExprKind::FieldAccess { base, .. } | ExprKind::ArrayAccess { base, .. } => root_variable(base),
        _ => None,
    }
}
