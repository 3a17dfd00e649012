//! Declarations: globals, functions and locals

use tracing::debug;

use super::CodeGen;
use crate::common::{CompileError, CompileResult};
use crate::frontend::ast::*;
use crate::frontend::sema::{Storage, Symbol};
use crate::ir::Value;
use crate::types::Type;

/// Value of a constant global initializer, converted to `ty`
fn const_value(expr: &Expr, ty: &Type) -> CompileResult<Value> {
    let not_constant = || CompileError::codegen("global initializer is not constant");

    let value = match &expr.kind {
        ExprKind::IntConst(n) if ty.is_float() => Value::FloatConst(*n as f64),
        ExprKind::IntConst(n) => Value::IntConst(*n),
        ExprKind::FloatConst(x) => Value::FloatConst(*x),
        ExprKind::BoolConst(b) => Value::BoolConst(*b),
        ExprKind::Unary { op: UnaryOp::Plus, operand } => const_value(operand, ty)?,
        ExprKind::Unary { op: UnaryOp::Minus, operand } => match const_value(operand, ty)? {
            Value::IntConst(n) => Value::IntConst(n.wrapping_neg()),
            Value::FloatConst(x) => Value::FloatConst(-x),
            _ => return Err(not_constant()),
        },
        ExprKind::Constructor { ty: target, args } if target.is_vector() || target.is_matrix() => {
            let mut lanes = Vec::with_capacity(target.lanes());
            for arg in args {
                match const_value(arg, &Type::Float)? {
                    Value::FloatConst(x) => lanes.push(x),
                    Value::VectorConst(inner) => lanes.extend(inner),
                    _ => return Err(not_constant()),
                }
            }
            if lanes.len() == 1 {
                lanes = vec![lanes[0]; target.lanes()];
            }
            Value::VectorConst(lanes)
        }
        ExprKind::Constructor { args, .. } => match args.as_slice() {
            [single] => const_value(single, ty)?,
            _ => return Err(not_constant()),
        },
        _ => return Err(not_constant()),
    };

    // A float-to-int constructor such as `int(2.5)` truncates
    match (value, ty) {
        (Value::FloatConst(x), Type::Int) => Ok(Value::IntConst(x as i64)),
        (Value::BoolConst(b), Type::Int) => Ok(Value::IntConst(i64::from(b))),
        (Value::BoolConst(b), Type::Float) => Ok(Value::FloatConst(f64::from(u8::from(b)))),
        (Value::IntConst(n), Type::Bool) => Ok(Value::BoolConst(n != 0)),
        (Value::FloatConst(x), Type::Bool) => Ok(Value::BoolConst(x != 0.0)),
        (value, _) => Ok(value),
    }
}

impl<'ast> CodeGen<'ast> {
    pub fn emit_program(&mut self, program: &'ast Program) -> CompileResult<()> {
        for decl in &program.decls {
            match &decl.kind {
                DeclKind::Var(var) => self.emit_global(var)?,
                DeclKind::Func(func) => self.emit_function(func)?,
            }
        }
        Ok(())
    }

    fn emit_global(&mut self, var: &'ast VarDecl) -> CompileResult<()> {
        let init = match &var.init {
            Some(expr) => Some(const_value(expr, &var.ty)?),
            None => None,
        };
        let addr = self.builder.add_global(var.name.name.clone(), var.ty.ir_type(), init);
        self.symbols
            .declare(Symbol::variable(var).with_storage(Storage::Address(addr)));
        Ok(())
    }

    fn emit_function(&mut self, func: &'ast FnDecl) -> CompileResult<()> {
        debug!(name = %func.name, "emitting function");
        let name = func.name.name.clone();
        self.symbols
            .declare(Symbol::function(func).with_storage(Storage::Function(name.clone())));

        let params = func
            .formals
            .iter()
            .map(|formal| (formal.name.name.clone(), formal.ty.ir_type()))
            .collect();
        self.builder.begin_function(name, params, func.return_type.ir_type())?;
        let entry = self.builder.create_block("entry")?;
        self.builder.position_at_end(entry);

        self.symbols.push();
        for formal in &func.formals {
            let addr = self.builder.alloca(formal.ty.ir_type(), &formal.name.name)?;
            self.builder
                .store(addr.clone(), Value::Param(formal.name.name.clone()))?;
            self.symbols
                .declare(Symbol::variable(formal).with_storage(Storage::Address(addr)));
        }

        self.current_return = func.return_type.clone();
        self.emit_block(&func.body)?;

        // Falling off the end is only legal for void functions
        if !self.builder.is_terminated() {
            if func.return_type.is_void() {
                self.builder.ret(None)?;
            } else {
                self.builder.unreachable()?;
            }
        }
        self.symbols.pop();
        self.current_return = Type::Void;

        self.builder.finish_function()
    }

    pub(super) fn emit_local(&mut self, var: &'ast VarDecl) -> CompileResult<()> {
        let addr = self.builder.alloca(var.ty.ir_type(), &var.name.name)?;
        if let Some(init) = &var.init {
            let value = self.emit_expr(init)?;
            let value = self.coerce(value, &var.ty)?;
            self.builder.store(addr.clone(), value)?;
        }
        self.symbols
            .declare(Symbol::variable(var).with_storage(Storage::Address(addr)));
        Ok(())
    }
}
