//! Code generation: checked syntax tree to IR
//!
//! A single pass over the program. The generator keeps its own symbol table,
//! whose symbols carry the address (or function name) assigned to each
//! declaration, and a stack of break/continue frames for the enclosing
//! loops and switches.

mod decl;
mod expr;
mod stmt;

use tracing::{debug, instrument};

use crate::common::{CompileError, CompileResult};
use crate::frontend::ast::{Expr, Program};
use crate::frontend::sema::{check, CheckedProgram, Diagnostic, Storage, SymbolTable};
use crate::ir::{BlockId, CmpPred, ConvOp, IrBuilder, IrModule, Value};
use crate::types::Type;

/// Name given to modules built by [`emit`]
pub const DEFAULT_MODULE_NAME: &str = "shader";

/// Lower a checked program to an IR module
#[instrument(skip_all)]
pub fn emit(checked: &CheckedProgram) -> CompileResult<IrModule> {
    let mut codegen = CodeGen::new(DEFAULT_MODULE_NAME);
    codegen.emit_program(checked.program())?;
    let module = codegen.finish();
    debug!(
        functions = module.functions.len(),
        globals = module.globals.len(),
        "emitted module"
    );
    Ok(module)
}

/// Check `program` and lower it if it is clean
///
/// A program with diagnostics is refused with
/// [`CompileError::UncheckedProgram`] carrying them.
pub fn emit_program(program: &Program) -> CompileResult<IrModule> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    match check(program, &mut diagnostics) {
        Some(checked) => emit(&checked),
        None => Err(CompileError::UncheckedProgram { diagnostics }),
    }
}

/// Targets of `break` and `continue` inside a loop or switch
#[derive(Debug, Clone, Copy)]
struct Frame {
    break_to: BlockId,
    /// `None` for a switch: `continue` goes to the enclosing loop
    continue_to: Option<BlockId>,
}

/// An emitted value together with its source type
#[derive(Debug, Clone)]
struct Typed {
    value: Value,
    ty: Type,
}

impl Typed {
    fn new(value: Value, ty: Type) -> Self {
        Self { value, ty }
    }
}

pub struct CodeGen<'ast> {
    builder: IrBuilder,
    symbols: SymbolTable<'ast>,
    frames: Vec<Frame>,
    current_return: Type,
}

impl<'ast> CodeGen<'ast> {
    pub fn new(module_name: &str) -> Self {
        Self {
            builder: IrBuilder::new(module_name),
            symbols: SymbolTable::new(),
            frames: Vec::new(),
            current_return: Type::Void,
        }
    }

    pub fn finish(self) -> IrModule {
        self.builder.finish()
    }

    /// Address and declared type of the variable `name`
    fn variable(&self, name: &str) -> CompileResult<(Value, &'ast Type)> {
        let symbol = self
            .symbols
            .lookup(name)
            .ok_or_else(|| CompileError::codegen(format!("unresolved variable '{}'", name)))?;
        match (&symbol.storage, symbol.as_var()) {
            (Some(Storage::Address(addr)), Some(var)) => Ok((addr.clone(), &var.ty)),
            _ => Err(CompileError::codegen(format!("'{}' has no storage", name))),
        }
    }

    /// Bring `typed` to `target`
    ///
    /// Defined for every pair of value types, because an `error`-typed
    /// subtree passes the checker whatever it evaluates to. Scalars convert
    /// among themselves (bools as 0 and 1, non-zero as true); a scalar fills
    /// every lane of a vector or matrix; a shape of another width broadcasts
    /// its lane 0; an array target is filled element by element. Read as a
    /// scalar, a shape or array gives its first lane and void gives 0.
    fn coerce(&mut self, typed: Typed, target: &Type) -> CompileResult<Value> {
        if typed.ty == *target {
            return Ok(typed.value);
        }
        match target {
            Type::Void => Ok(Value::Undef),
            Type::Error => Err(CompileError::codegen("no value has the error type")),
            Type::Array { elem, len } => self.fill_array(typed, elem, *len, target),
            Type::Int | Type::Float | Type::Bool => {
                let scalar = self.scalar_of(typed)?;
                self.convert_scalar(scalar, target)
            }
            shaped => {
                if is_shaped(&typed.ty) {
                    // mat2 and vec4 share one lowering
                    if typed.ty.lanes() == shaped.lanes() {
                        return Ok(typed.value);
                    }
                    let lane = self.builder.extract_lane(typed.value, 0)?;
                    return self.splat(lane, shaped.lanes());
                }
                let scalar = self.scalar_of(typed)?;
                let lane = self.convert_scalar(scalar, &Type::Float)?;
                self.splat(lane, shaped.lanes())
            }
        }
    }

    fn convert_scalar(&mut self, scalar: Typed, target: &Type) -> CompileResult<Value> {
        let op = match (&scalar.ty, target) {
            (from, to) if from == to => return Ok(scalar.value),
            (Type::Int, Type::Float) => ConvOp::IntToFloat,
            (Type::Float, Type::Int) => ConvOp::FloatToInt,
            (Type::Bool, Type::Int) => ConvOp::BoolToInt,
            (Type::Bool, Type::Float) => ConvOp::BoolToFloat,
            (Type::Int, Type::Bool) => {
                return self.builder.cmp(CmpPred::Ne, scalar.value, Value::IntConst(0));
            }
            (Type::Float, Type::Bool) => {
                return self.builder.cmp(CmpPred::One, scalar.value, Value::FloatConst(0.0));
            }
            (from, to) => {
                return Err(CompileError::codegen(format!("cannot convert {} to {}", from, to)));
            }
        };
        self.builder.convert(op, scalar.value)
    }

    /// `typed` itself for an int, float or bool, otherwise its first scalar
    fn scalar_of(&mut self, typed: Typed) -> CompileResult<Typed> {
        match typed.ty.clone() {
            Type::Int | Type::Float | Type::Bool => Ok(typed),
            Type::Void | Type::Error => Ok(Typed::new(Value::IntConst(0), Type::Int)),
            Type::Array { elem, .. } => {
                let spill = self.spill(typed)?;
                let first = self.builder.element_ptr(spill, Value::IntConst(0))?;
                let value = self.builder.load(elem.ir_type(), first)?;
                self.scalar_of(Typed::new(value, *elem))
            }
            _ => {
                let lane = self.builder.extract_lane(typed.value, 0)?;
                Ok(Typed::new(lane, Type::Float))
            }
        }
    }

    /// Operand as arithmetic sees it: shapes and numbers as they are, bools
    /// as 0 or 1, anything else by its first scalar
    fn arithmetic_view(&mut self, typed: Typed) -> CompileResult<Typed> {
        if typed.ty.is_arithmetic() {
            return Ok(typed);
        }
        let scalar = self.scalar_of(typed)?;
        if scalar.ty.is_bool() {
            let value = self.builder.convert(ConvOp::BoolToInt, scalar.value)?;
            return Ok(Typed::new(value, Type::Int));
        }
        Ok(scalar)
    }

    /// Store an array value into a fresh slot so its elements can be addressed
    fn spill(&mut self, array: Typed) -> CompileResult<Value> {
        let slot = self.builder.alloca(array.ty.ir_type(), "spill")?;
        self.builder.store(slot.clone(), array.value)?;
        Ok(slot)
    }

    /// Array of `len` elements built from `typed`
    ///
    /// An array source is copied element by element, repeating its first
    /// element past its end; any other value is stored into every element.
    fn fill_array(&mut self, typed: Typed, elem: &Type, len: usize, target: &Type) -> CompileResult<Value> {
        let slot = self.builder.alloca(target.ir_type(), "fill")?;
        if let Type::Array { elem: from, len: from_len } = typed.ty.clone() {
            let spill = self.spill(typed)?;
            for k in 0..len {
                let index = if k < from_len { k } else { 0 };
                let src = self.builder.element_ptr(spill.clone(), Value::IntConst(index as i64))?;
                let value = self.builder.load(from.ir_type(), src)?;
                let value = self.coerce(Typed::new(value, (*from).clone()), elem)?;
                let dst = self.builder.element_ptr(slot.clone(), Value::IntConst(k as i64))?;
                self.builder.store(dst, value)?;
            }
        } else {
            let value = self.coerce(typed, elem)?;
            for k in 0..len {
                let dst = self.builder.element_ptr(slot.clone(), Value::IntConst(k as i64))?;
                self.builder.store(dst, value.clone())?;
            }
        }
        self.builder.load(target.ir_type(), slot)
    }

    /// Broadcast a float into every lane of a new vector
    fn splat(&mut self, scalar: Value, lanes: usize) -> CompileResult<Value> {
        let mut vector = Value::Undef;
        for lane in 0..lanes as u32 {
            vector = self.builder.insert_lane(vector, scalar.clone(), lane)?;
        }
        Ok(vector)
    }

    /// Evaluate a branch condition as a bool
    fn emit_condition(&mut self, test: &'ast Expr) -> CompileResult<Value> {
        let value = self.emit_expr(test)?;
        self.coerce(value, &Type::Bool)
    }
}

fn is_shaped(ty: &Type) -> bool {
    ty.is_vector() || ty.is_matrix()
}
