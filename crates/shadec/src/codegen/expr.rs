//! Expression lowering

use super::{is_shaped, CodeGen, Typed};
use crate::common::{CompileError, CompileResult};
use crate::frontend::ast::*;
use crate::frontend::sema::Storage;
use crate::ir::{BinOp, CmpPred, Value};
use crate::types::{swizzle, IrType, Type};

/// Storage designated by an l-value expression
#[derive(Debug, Clone)]
enum Place {
    /// A whole variable or array element
    Memory { addr: Value, ty: Type },
    /// Some lanes of a vector variable, in selection order
    Lanes {
        addr: Value,
        base_ty: Type,
        lanes: Vec<u32>,
    },
}

fn arith_op(op: BinaryOp, int: bool) -> CompileResult<BinOp> {
    let ir_op = match (op, int) {
        (BinaryOp::Add, true) => BinOp::Add,
        (BinaryOp::Sub, true) => BinOp::Sub,
        (BinaryOp::Mul, true) => BinOp::Mul,
        (BinaryOp::Div, true) => BinOp::SDiv,
        (BinaryOp::Add, false) => BinOp::FAdd,
        (BinaryOp::Sub, false) => BinOp::FSub,
        (BinaryOp::Mul, false) => BinOp::FMul,
        (BinaryOp::Div, false) => BinOp::FDiv,
        _ => return Err(CompileError::codegen(format!("'{}' is not arithmetic", op))),
    };
    Ok(ir_op)
}

fn compare_pred(op: BinaryOp, float: bool) -> CompileResult<CmpPred> {
    let pred = match (op, float) {
        (BinaryOp::Eq, false) => CmpPred::Eq,
        (BinaryOp::Ne, false) => CmpPred::Ne,
        (BinaryOp::Lt, false) => CmpPred::Slt,
        (BinaryOp::Le, false) => CmpPred::Sle,
        (BinaryOp::Gt, false) => CmpPred::Sgt,
        (BinaryOp::Ge, false) => CmpPred::Sge,
        (BinaryOp::Eq, true) => CmpPred::Oeq,
        (BinaryOp::Ne, true) => CmpPred::One,
        (BinaryOp::Lt, true) => CmpPred::Olt,
        (BinaryOp::Le, true) => CmpPred::Ole,
        (BinaryOp::Gt, true) => CmpPred::Ogt,
        (BinaryOp::Ge, true) => CmpPred::Oge,
        _ => return Err(CompileError::codegen(format!("'{}' is not a comparison", op))),
    };
    Ok(pred)
}

fn zero_of(ty: &Type) -> CompileResult<Value> {
    match ty {
        Type::Int => Ok(Value::IntConst(0)),
        Type::Float => Ok(Value::FloatConst(0.0)),
        shaped if shaped.is_vector() || shaped.is_matrix() => {
            Ok(Value::VectorConst(vec![0.0; shaped.lanes()]))
        }
        other => Err(CompileError::codegen(format!("no zero of type {}", other))),
    }
}

/// The vector or matrix type among two operands, left first
fn wider_of(left: &Type, right: &Type) -> Option<Type> {
    [left, right].into_iter().find(|ty| is_shaped(ty)).cloned()
}

fn lane_mask(field: &Identifier) -> CompileResult<Vec<u32>> {
    swizzle::lane_mask(&field.name)
        .ok_or_else(|| CompileError::codegen(format!("invalid swizzle '{}'", field.name)))
}

impl<'ast> CodeGen<'ast> {
    pub(super) fn emit_expr(&mut self, expr: &'ast Expr) -> CompileResult<Typed> {
        match &expr.kind {
            ExprKind::IntConst(n) => Ok(Typed::new(Value::IntConst(*n), Type::Int)),
            ExprKind::FloatConst(x) => Ok(Typed::new(Value::FloatConst(*x), Type::Float)),
            ExprKind::BoolConst(b) => Ok(Typed::new(Value::BoolConst(*b), Type::Bool)),

            ExprKind::Var(_) | ExprKind::ArrayAccess { .. } => {
                let place = self.place_of(expr)?;
                self.load_place(&place)
            }

            ExprKind::Binary { op, left, right } => {
                let left = self.emit_expr(left)?;
                let right = self.emit_expr(right)?;
                self.emit_binary(*op, left, right)
            }

            ExprKind::Unary { op, operand } => self.emit_unary(*op, operand),

            ExprKind::Assign { op, target, value } => self.emit_assign(*op, target, value),

            ExprKind::Postfix { op, operand } => {
                let step = match op {
                    PostfixOp::Inc => BinaryOp::Add,
                    PostfixOp::Dec => BinaryOp::Sub,
                };
                self.emit_step(operand, step, true)
            }

            ExprKind::Conditional { test, then_expr, else_expr } => {
                self.emit_conditional(test, then_expr, else_expr)
            }

            ExprKind::FieldAccess { base, field } => {
                let lanes = lane_mask(field)?;
                let base = self.emit_expr(base)?;
                let width = base.ty.lanes();
                let vector = if is_shaped(&base.ty) && lanes.iter().all(|&l| (l as usize) < width) {
                    base.value
                } else {
                    self.coerce(base, &Type::Vec4)?
                };
                self.select_lanes(vector, &lanes)
            }

            ExprKind::Call { callee, args } => self.emit_call(callee, args),

            ExprKind::Constructor { ty, args } => self.emit_constructor(ty, args),
        }
    }

    fn emit_binary(&mut self, op: BinaryOp, left: Typed, right: Typed) -> CompileResult<Typed> {
        match op.class() {
            OpClass::Arithmetic => self.emit_arith(op, left, right),
            OpClass::Relational | OpClass::Equality => self.emit_compare(op, left, right),
            OpClass::Logical => {
                // Both sides are already evaluated: no short circuit
                let ir_op = if op == BinaryOp::And { BinOp::And } else { BinOp::Or };
                let lhs = self.coerce(left, &Type::Bool)?;
                let rhs = self.coerce(right, &Type::Bool)?;
                let value = self.builder.binary(ir_op, IrType::i1(), lhs, rhs)?;
                Ok(Typed::new(value, Type::Bool))
            }
        }
    }

    fn emit_arith(&mut self, op: BinaryOp, left: Typed, right: Typed) -> CompileResult<Typed> {
        let left = self.arithmetic_view(left)?;
        let right = self.arithmetic_view(right)?;
        let ty = match left.ty.arithmetic_result(&right.ty) {
            Some(ty) if !ty.is_error() => ty,
            // Mismatched shapes only survive checking under an error type
            _ => wider_of(&left.ty, &right.ty).unwrap_or(Type::Float),
        };
        let ir_op = arith_op(op, ty.is_int())?;
        let lhs = self.coerce(left, &ty)?;
        let rhs = self.coerce(right, &ty)?;
        let value = self.builder.binary(ir_op, ty.ir_type(), lhs, rhs)?;
        Ok(Typed::new(value, ty))
    }

    /// Comparisons of vectors and matrices go lane by lane; bools order as
    /// 0 and 1
    fn emit_compare(&mut self, op: BinaryOp, left: Typed, right: Typed) -> CompileResult<Typed> {
        if left.ty.is_bool() && right.ty.is_bool() && op.class() == OpClass::Equality {
            let pred = compare_pred(op, false)?;
            let value = self.builder.cmp(pred, left.value, right.value)?;
            return Ok(Typed::new(value, Type::Bool));
        }

        let left = self.arithmetic_view(left)?;
        let right = self.arithmetic_view(right)?;
        if let Some(shape) = wider_of(&left.ty, &right.ty) {
            let lhs = self.coerce(left, &shape)?;
            let rhs = self.coerce(right, &shape)?;
            return self.emit_lanewise_compare(op, lhs, rhs, shape.lanes());
        }

        let value = if left.ty.is_int() && right.ty.is_int() {
            let pred = compare_pred(op, false)?;
            self.builder.cmp(pred, left.value, right.value)?
        } else {
            let pred = compare_pred(op, true)?;
            let lhs = self.coerce(left, &Type::Float)?;
            let rhs = self.coerce(right, &Type::Float)?;
            self.builder.cmp(pred, lhs, rhs)?
        };
        Ok(Typed::new(value, Type::Bool))
    }

    /// `!=` holds when any lane differs, every other operator when it holds
    /// in every lane
    fn emit_lanewise_compare(&mut self, op: BinaryOp, left: Value, right: Value, lanes: usize) -> CompileResult<Typed> {
        let pred = compare_pred(op, true)?;
        let fold = if op == BinaryOp::Ne { BinOp::Or } else { BinOp::And };

        let mut result: Option<Value> = None;
        for lane in 0..lanes as u32 {
            let a = self.builder.extract_lane(left.clone(), lane)?;
            let b = self.builder.extract_lane(right.clone(), lane)?;
            let holds = self.builder.cmp(pred, a, b)?;
            result = Some(match result {
                None => holds,
                Some(acc) => self.builder.binary(fold, IrType::i1(), acc, holds)?,
            });
        }
        let value = result.ok_or_else(|| CompileError::codegen("comparison of empty vector"))?;
        Ok(Typed::new(value, Type::Bool))
    }

    fn emit_unary(&mut self, op: UnaryOp, operand: &'ast Expr) -> CompileResult<Typed> {
        match op {
            UnaryOp::Plus | UnaryOp::Minus => {
                let operand = self.emit_expr(operand)?;
                let operand = self.arithmetic_view(operand)?;
                let zero = zero_of(&operand.ty)?;
                let step = if op == UnaryOp::Plus { BinaryOp::Add } else { BinaryOp::Sub };
                let ir_op = arith_op(step, operand.ty.is_int())?;
                let value = self.builder.binary(ir_op, operand.ty.ir_type(), zero, operand.value)?;
                Ok(Typed::new(value, operand.ty))
            }
            UnaryOp::Not => {
                let operand = self.emit_expr(operand)?;
                let operand = self.coerce(operand, &Type::Bool)?;
                let value = self.builder.binary(BinOp::Xor, IrType::i1(), operand, Value::BoolConst(true))?;
                Ok(Typed::new(value, Type::Bool))
            }
            UnaryOp::Inc => self.emit_step(operand, BinaryOp::Add, false),
            UnaryOp::Dec => self.emit_step(operand, BinaryOp::Sub, false),
        }
    }

    /// Unit added by `++`; vector units are built lane by lane
    fn unit_of(&mut self, ty: &Type) -> CompileResult<Value> {
        match ty {
            Type::Int => Ok(Value::IntConst(1)),
            Type::Float => Ok(Value::FloatConst(1.0)),
            shaped if shaped.is_vector() || shaped.is_matrix() => {
                self.splat(Value::FloatConst(1.0), shaped.lanes())
            }
            other => Err(CompileError::codegen(format!("cannot step a value of type {}", other))),
        }
    }

    /// `++`/`--` in either position; `postfix` yields the value before the update
    fn emit_step(&mut self, operand: &'ast Expr, step: BinaryOp, postfix: bool) -> CompileResult<Typed> {
        match self.place_of(operand)? {
            Place::Lanes { addr, base_ty, lanes } => {
                let before = if postfix {
                    Some(self.load_lanes(&addr, &base_ty, &lanes)?)
                } else {
                    None
                };

                let ir_op = arith_op(step, false)?;
                for &lane in &lanes {
                    let base = self.builder.load(base_ty.ir_type(), addr.clone())?;
                    let x = self.builder.extract_lane(base.clone(), lane)?;
                    let stepped = self.builder.binary(ir_op, IrType::f32(), x, Value::FloatConst(1.0))?;
                    let updated = self.builder.insert_lane(base, stepped, lane)?;
                    self.builder.store(addr.clone(), updated)?;
                }

                match before {
                    Some(value) => Ok(value),
                    None => self.load_lanes(&addr, &base_ty, &lanes),
                }
            }
            Place::Memory { addr, ty } => {
                let current = self.builder.load(ty.ir_type(), addr.clone())?;
                let unit = self.unit_of(&ty)?;
                let ir_op = arith_op(step, ty.is_int())?;
                let updated = self.builder.binary(ir_op, ty.ir_type(), current.clone(), unit)?;
                self.builder.store(addr, updated.clone())?;
                Ok(Typed::new(if postfix { current } else { updated }, ty))
            }
        }
    }

    fn emit_assign(&mut self, op: AssignOp, target: &'ast Expr, value: &'ast Expr) -> CompileResult<Typed> {
        let place = self.place_of(target)?;
        let result = match op.binary_op() {
            None => self.emit_expr(value)?,
            Some(arith) => {
                let current = self.load_place(&place)?;
                let rhs = self.emit_expr(value)?;
                self.emit_arith(arith, current, rhs)?
            }
        };
        self.store_place(&place, result)
    }

    fn emit_conditional(
        &mut self,
        test: &'ast Expr,
        then_expr: &'ast Expr,
        else_expr: &'ast Expr,
    ) -> CompileResult<Typed> {
        let cond = self.emit_condition(test)?;
        let origin = self
            .builder
            .current_block()
            .ok_or_else(|| CompileError::codegen("conditional outside a block"))?;

        let then_block = self.builder.create_block("cond.then")?;
        let else_block = self.builder.create_block("cond.else")?;
        let end_block = self.builder.create_block("cond.end")?;
        self.builder.cond_branch(cond, then_block, else_block)?;

        self.builder.position_at_end(then_block);
        let then_value = self.emit_expr(then_expr)?;
        let then_end = self.builder.current_block().unwrap_or(then_block);

        self.builder.position_at_end(else_block);
        let else_value = self.emit_expr(else_expr)?;
        let else_end = self.builder.current_block().unwrap_or(else_block);

        // The arms decide the result type, so the slot is added afterwards
        let ty = match then_value.ty.common_type(&else_value.ty) {
            Some(ty) if !ty.is_error() => ty,
            _ if then_value.ty.is_void() => else_value.ty.clone(),
            _ => then_value.ty.clone(),
        };
        if ty.is_void() {
            for end in [then_end, else_end] {
                self.builder.position_at_end(end);
                self.builder.branch(end_block)?;
            }
            self.builder.position_at_end(end_block);
            return Ok(Typed::new(Value::Undef, Type::Void));
        }
        let slot = self.builder.alloca_in(origin, ty.ir_type(), "cond")?;

        for (end, value) in [(then_end, then_value), (else_end, else_value)] {
            self.builder.position_at_end(end);
            let value = self.coerce(value, &ty)?;
            self.builder.store(slot.clone(), value)?;
            self.builder.branch(end_block)?;
        }

        self.builder.position_at_end(end_block);
        let value = self.builder.load(ty.ir_type(), slot)?;
        Ok(Typed::new(value, ty))
    }

    fn emit_call(&mut self, callee: &'ast Identifier, args: &'ast [Expr]) -> CompileResult<Typed> {
        let (func, name) = {
            let symbol = self
                .symbols
                .lookup(&callee.name)
                .ok_or_else(|| CompileError::codegen(format!("unresolved function '{}'", callee.name)))?;
            match (symbol.as_func(), &symbol.storage) {
                (Some(func), Some(Storage::Function(name))) => (func, name.clone()),
                _ => {
                    return Err(CompileError::codegen(format!(
                        "'{}' is not a generated function",
                        callee.name
                    )));
                }
            }
        };

        let mut values = Vec::with_capacity(args.len());
        for (arg, formal) in args.iter().zip(&func.formals) {
            let actual = self.emit_expr(arg)?;
            values.push(self.coerce(actual, &formal.ty)?);
        }

        let result = self.builder.call(&name, values, !func.return_type.is_void())?;
        Ok(Typed::new(result.unwrap_or(Value::Undef), func.return_type.clone()))
    }

    fn emit_constructor(&mut self, ty: &'ast Type, args: &'ast [Expr]) -> CompileResult<Typed> {
        let mut typed = Vec::with_capacity(args.len());
        for arg in args {
            typed.push(self.emit_expr(arg)?);
        }

        if ty.is_vector() || ty.is_matrix() {
            let value = self.build_shaped(ty, typed)?;
            return Ok(Typed::new(value, ty.clone()));
        }

        let arg = typed
            .into_iter()
            .next()
            .ok_or_else(|| CompileError::codegen(format!("{} constructor without argument", ty)))?;
        let value = match ty {
            Type::Int | Type::Float | Type::Bool => self.coerce(arg, ty)?,
            other => return Err(CompileError::codegen(format!("cannot construct {}", other))),
        };
        Ok(Typed::new(value, ty.clone()))
    }

    /// Vector or matrix from a splatted scalar or from the concatenated lanes
    /// of the arguments
    fn build_shaped(&mut self, ty: &Type, args: Vec<Typed>) -> CompileResult<Value> {
        let lanes = ty.lanes();
        if let [single] = args.as_slice() {
            if !is_shaped(&single.ty) {
                let scalar = self.coerce(single.clone(), &Type::Float)?;
                return match scalar {
                    Value::FloatConst(x) => Ok(Value::VectorConst(vec![x; lanes])),
                    other => self.splat(other, lanes),
                };
            }
        }

        let mut values = Vec::with_capacity(lanes);
        for arg in args {
            if is_shaped(&arg.ty) {
                for lane in 0..arg.ty.lanes() as u32 {
                    values.push(self.builder.extract_lane(arg.value.clone(), lane)?);
                }
            } else {
                values.push(self.coerce(arg, &Type::Float)?);
            }
        }
        values.resize(lanes, Value::FloatConst(0.0));

        let constants: Option<Vec<f64>> = values
            .iter()
            .map(|v| match v {
                Value::FloatConst(x) => Some(*x),
                _ => None,
            })
            .collect();
        if let Some(constants) = constants {
            return Ok(Value::VectorConst(constants));
        }

        let mut vector = Value::Undef;
        for (lane, value) in values.into_iter().enumerate() {
            vector = self.builder.insert_lane(vector, value, lane as u32)?;
        }
        Ok(vector)
    }

    /// One lane as a float, several as a shuffled vector
    fn select_lanes(&mut self, vector: Value, lanes: &[u32]) -> CompileResult<Typed> {
        let ty = swizzle::result_type(lanes.len());
        let value = match lanes {
            [lane] => self.builder.extract_lane(vector, *lane)?,
            _ => self.builder.shuffle(vector, lanes.to_vec())?,
        };
        Ok(Typed::new(value, ty))
    }

    fn place_of(&mut self, expr: &'ast Expr) -> CompileResult<Place> {
        match &expr.kind {
            ExprKind::Var(id) => {
                let (addr, ty) = self.variable(&id.name)?;
                Ok(Place::Memory {
                    addr,
                    ty: ty.clone(),
                })
            }

            ExprKind::ArrayAccess { base, index } => {
                let Place::Memory { addr, ty } = self.place_of(base)? else {
                    return Err(CompileError::codegen("subscript of a swizzle"));
                };
                let element = ty
                    .element_type()
                    .cloned()
                    .ok_or_else(|| CompileError::codegen(format!("subscript of non-array {}", ty)))?;
                let index = self.emit_expr(index)?;
                let index = self.coerce(index, &Type::Int)?;
                let addr = self.builder.element_ptr(addr, index)?;
                Ok(Place::Memory { addr, ty: element })
            }

            ExprKind::FieldAccess { base, field } => {
                let mask = lane_mask(field)?;
                match self.place_of(base)? {
                    Place::Memory { addr, ty } => Ok(Place::Lanes {
                        addr,
                        base_ty: ty,
                        lanes: mask,
                    }),
                    // `v.zyx.xy` writes lanes z and y of `v`
                    Place::Lanes { addr, base_ty, lanes } => {
                        let composed = mask
                            .iter()
                            .map(|&i| lanes.get(i as usize).copied())
                            .collect::<Option<Vec<u32>>>()
                            .ok_or_else(|| CompileError::codegen(format!("swizzle '{}' out of range", field.name)))?;
                        Ok(Place::Lanes {
                            addr,
                            base_ty,
                            lanes: composed,
                        })
                    }
                }
            }

            _ => Err(CompileError::codegen("expression is not assignable")),
        }
    }

    fn load_place(&mut self, place: &Place) -> CompileResult<Typed> {
        match place {
            Place::Memory { addr, ty } => {
                let value = self.builder.load(ty.ir_type(), addr.clone())?;
                Ok(Typed::new(value, ty.clone()))
            }
            Place::Lanes { addr, base_ty, lanes } => self.load_lanes(addr, base_ty, lanes),
        }
    }

    fn load_lanes(&mut self, addr: &Value, base_ty: &Type, lanes: &[u32]) -> CompileResult<Typed> {
        let base = self.builder.load(base_ty.ir_type(), addr.clone())?;
        self.select_lanes(base, lanes)
    }

    /// Write `value` to `place`, returning what was stored
    ///
    /// A swizzled destination is updated one lane at a time. Source lane `i`
    /// goes to the `i`th selected lane when the widths match; otherwise source
    /// lane 0 goes to every selected lane. A scalar source fills every lane
    /// and is returned as a float.
    fn store_place(&mut self, place: &Place, value: Typed) -> CompileResult<Typed> {
        match place {
            Place::Memory { addr, ty } => {
                let stored = self.coerce(value, ty)?;
                self.builder.store(addr.clone(), stored.clone())?;
                Ok(Typed::new(stored, ty.clone()))
            }
            Place::Lanes { addr, base_ty, lanes } => {
                let scalar = if is_shaped(&value.ty) {
                    None
                } else {
                    Some(self.coerce(value.clone(), &Type::Float)?)
                };
                let same_width = value.ty.lanes() == lanes.len();

                for (i, &lane) in lanes.iter().enumerate() {
                    let source = match &scalar {
                        Some(scalar) => scalar.clone(),
                        None => {
                            let from = if same_width { i as u32 } else { 0 };
                            self.builder.extract_lane(value.value.clone(), from)?
                        }
                    };
                    let base = self.builder.load(base_ty.ir_type(), addr.clone())?;
                    let updated = self.builder.insert_lane(base, source, lane)?;
                    self.builder.store(addr.clone(), updated)?;
                }
                Ok(match scalar {
                    Some(scalar) => Typed::new(scalar, Type::Float),
                    None => value,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::tests::module;
    use crate::ir::{BinOp, CmpPred, ConvOp, Inst, IrFunction, Terminator, Value};

    fn main_of(body: &str) -> IrFunction {
        let module = module(&format!("void main() {{ {} }}", body));
        module.function("main").unwrap().clone()
    }

    fn count(func: &IrFunction, pred: impl Fn(&Inst) -> bool) -> usize {
        func.insts().filter(|i| pred(i)).count()
    }

    #[test]
    fn test_int_add_of_constants() {
        let main = main_of("int x; x = 2 + 3;");
        let adds: Vec<&Inst> = main
            .insts()
            .filter(|i| matches!(i, Inst::Binary { op: BinOp::Add, .. }))
            .collect();
        assert_eq!(adds.len(), 1);
        assert!(matches!(
            adds[0],
            Inst::Binary { left: Value::IntConst(2), right: Value::IntConst(3), .. }
        ));
        assert_eq!(count(&main, |i| matches!(i, Inst::Store { .. })), 1);
    }

    #[test]
    fn test_swizzle_store_inserts_two_lanes() {
        let main = main_of("vec3 v; v.xy = vec2(1.0, 2.0);");
        let inserts: Vec<(u32, Value)> = main
            .insts()
            .filter_map(|i| match i {
                Inst::InsertLane { lane, value, .. } => Some((*lane, value.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            inserts,
            vec![(0, Value::FloatConst(1.0)), (1, Value::FloatConst(2.0))]
        );
    }

    #[test]
    fn test_vector_plus_scalar_broadcasts() {
        let main = main_of("float f; vec3 v; v += f;");
        assert_eq!(count(&main, |i| matches!(i, Inst::InsertLane { .. })), 3);
        assert_eq!(count(&main, |i| matches!(i, Inst::Binary { op: BinOp::FAdd, .. })), 1);
        assert_eq!(count(&main, |i| matches!(i, Inst::Store { .. })), 1);
    }

    #[test]
    fn test_logical_operators_do_not_short_circuit() {
        let main = main_of("bool a; bool b; bool c; c = a && b; c = a || b;");
        assert_eq!(main.blocks.len(), 1);
        assert_eq!(count(&main, |i| matches!(i, Inst::Binary { op: BinOp::And, .. })), 1);
        assert_eq!(count(&main, |i| matches!(i, Inst::Binary { op: BinOp::Or, .. })), 1);
    }

    #[test]
    fn test_vector_equality_folds_lanes() {
        let main = main_of("vec2 a; vec2 b; bool c; c = a == b; c = a != b;");
        assert_eq!(count(&main, |i| matches!(i, Inst::Cmp { pred: CmpPred::Oeq, .. })), 2);
        assert_eq!(count(&main, |i| matches!(i, Inst::Cmp { pred: CmpPred::One, .. })), 2);
        assert_eq!(count(&main, |i| matches!(i, Inst::Binary { op: BinOp::And, .. })), 1);
        assert_eq!(count(&main, |i| matches!(i, Inst::Binary { op: BinOp::Or, .. })), 1);
    }

    #[test]
    fn test_vector_ordering_holds_in_every_lane() {
        let main = main_of("vec2 a; vec2 b; bool c; c = a < b;");
        assert_eq!(count(&main, |i| matches!(i, Inst::Cmp { pred: CmpPred::Olt, .. })), 2);
        assert_eq!(count(&main, |i| matches!(i, Inst::Binary { op: BinOp::And, .. })), 1);
    }

    #[test]
    fn test_bool_ordering_compares_as_integers() {
        let main = main_of("bool p; bool q; bool c; c = p < q; c = p == q;");
        assert_eq!(count(&main, |i| matches!(i, Inst::Convert { op: ConvOp::BoolToInt, .. })), 2);
        assert_eq!(count(&main, |i| matches!(i, Inst::Cmp { pred: CmpPred::Slt, .. })), 1);
        assert_eq!(count(&main, |i| matches!(i, Inst::Cmp { pred: CmpPred::Eq, .. })), 1);
    }

    #[test]
    fn test_mixed_comparison_result_converts_to_float() {
        let main = main_of("int i; float f; f = (i < 2.0);");
        assert_eq!(count(&main, |i| matches!(i, Inst::Cmp { pred: CmpPred::Olt, .. })), 1);
        assert_eq!(count(&main, |i| matches!(i, Inst::Convert { op: ConvOp::BoolToFloat, .. })), 1);
    }

    #[test]
    fn test_nested_assignment_converts_to_outer_target() {
        let main = main_of("int i; int k; float f; k = (f = i);");
        assert_eq!(count(&main, |i| matches!(i, Inst::Convert { op: ConvOp::IntToFloat, .. })), 1);
        assert_eq!(count(&main, |i| matches!(i, Inst::Convert { op: ConvOp::FloatToInt, .. })), 1);
        assert_eq!(count(&main, |i| matches!(i, Inst::Store { .. })), 2);
    }

    #[test]
    fn test_float_valued_condition_and_index() {
        let main = main_of("int i; float f; float a[2]; if (f = i) { a[f = i] = 1.0; }");
        assert!(main.insts().any(|i| matches!(
            i,
            Inst::Cmp { pred: CmpPred::One, right: Value::FloatConst(x), .. } if *x == 0.0
        )));
        assert_eq!(count(&main, |i| matches!(i, Inst::Convert { op: ConvOp::FloatToInt, .. })), 1);
    }

    #[test]
    fn test_comparison_predicates() {
        let main = main_of("int i; float f; bool b; b = i < 3; b = f >= 1.0; b = i < 2.0;");
        assert_eq!(count(&main, |i| matches!(i, Inst::Cmp { pred: CmpPred::Slt, .. })), 1);
        assert_eq!(count(&main, |i| matches!(i, Inst::Cmp { pred: CmpPred::Oge, .. })), 1);
        assert_eq!(count(&main, |i| matches!(i, Inst::Cmp { pred: CmpPred::Olt, .. })), 1);
        assert_eq!(count(&main, |i| matches!(i, Inst::Convert { .. })), 1);
    }

    #[test]
    fn test_postfix_yields_old_value() {
        let main = main_of("int i; int j; j = i++;");
        let loaded = main
            .insts()
            .find_map(|i| match i {
                Inst::Load { dst, .. } => Some(*dst),
                _ => None,
            })
            .unwrap();
        let stores: Vec<&Value> = main
            .insts()
            .filter_map(|i| match i {
                Inst::Store { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(stores.len(), 2);
        assert_eq!(stores[1], &Value::Temp(loaded));
    }

    #[test]
    fn test_postfix_on_swizzle_yields_old_lane() {
        let main = main_of("vec3 v; float f; f = v.x++;");
        let insts: Vec<&Inst> = main.insts().collect();
        let (first_extract, before) = insts
            .iter()
            .enumerate()
            .find_map(|(n, i)| match i {
                Inst::ExtractLane { dst, lane: 0, .. } => Some((n, *dst)),
                _ => None,
            })
            .unwrap();
        let first_store = insts.iter().position(|i| matches!(i, Inst::Store { .. })).unwrap();
        assert!(first_extract < first_store);
        assert!(matches!(
            insts.last(),
            Some(Inst::Store { value: Value::Temp(t), .. }) if *t == before
        ));
    }

    #[test]
    fn test_narrower_swizzle_target_takes_lane_zero() {
        let main = main_of("vec4 v; vec3 w; int i; v.xy = w + (i < 2.0);");
        let sum = main
            .insts()
            .find_map(|i| match i {
                Inst::Binary { dst, op: BinOp::FAdd, .. } => Some(Value::Temp(*dst)),
                _ => None,
            })
            .unwrap();
        let lanes: Vec<u32> = main
            .insts()
            .filter_map(|i| match i {
                Inst::ExtractLane { vector, lane, .. } if *vector == sum => Some(*lane),
                _ => None,
            })
            .collect();
        assert_eq!(lanes, vec![0, 0]);
        let inserted: Vec<u32> = main
            .insts()
            .filter_map(|i| match i {
                Inst::InsertLane { lane, .. } => Some(*lane),
                _ => None,
            })
            .collect();
        assert_eq!(&inserted[inserted.len() - 2..], &[0, 1]);
    }

    #[test]
    fn test_prefix_increment_of_swizzle_is_per_lane() {
        let main = main_of("vec4 v; ++v.xz;");
        assert_eq!(count(&main, |i| matches!(i, Inst::InsertLane { .. })), 2);
        assert_eq!(count(&main, |i| matches!(i, Inst::Store { .. })), 2);
        assert_eq!(
            count(&main, |i| matches!(i, Inst::Binary { op: BinOp::FAdd, right: Value::FloatConst(_), .. })),
            2
        );
    }

    #[test]
    fn test_vector_increment_builds_unit_by_insertion() {
        let main = main_of("vec2 v; v++;");
        assert_eq!(count(&main, |i| matches!(i, Inst::InsertLane { .. })), 2);
        assert_eq!(count(&main, |i| matches!(i, Inst::Binary { op: BinOp::FAdd, .. })), 1);
    }

    #[test]
    fn test_unary_minus_is_subtraction_from_zero() {
        let main = main_of("int i; i = -i;");
        assert_eq!(
            count(&main, |i| matches!(i, Inst::Binary { op: BinOp::Sub, left: Value::IntConst(0), .. })),
            1
        );
    }

    #[test]
    fn test_swizzle_reads() {
        let main = main_of("vec4 v; float f; vec2 w; f = v.y; w = v.wx;");
        assert!(main.insts().any(|i| matches!(i, Inst::ExtractLane { lane: 1, .. })));
        assert!(main.insts().any(|i| matches!(i, Inst::Shuffle { mask, .. } if mask == &vec![3, 0])));
    }

    #[test]
    fn test_single_lane_store_uses_scalar() {
        let main = main_of("vec4 v; v.z = 1;");
        assert_eq!(count(&main, |i| matches!(i, Inst::ExtractLane { .. })), 0);
        assert!(main.insts().any(|i| matches!(
            i,
            Inst::InsertLane { lane: 2, value: Value::FloatConst(x), .. } if *x == 1.0
        )));
    }

    #[test]
    fn test_array_element_access() {
        let main = main_of("float a[4]; int i; a[i] = 1.0; a[2] = a[i];");
        assert_eq!(count(&main, |i| matches!(i, Inst::ElementPtr { .. })), 3);
    }

    #[test]
    fn test_constructor_folding() {
        let main = main_of("vec3 v; float f; v = vec3(1, 2.0, 3.0); v = vec3(f, 0.0, 1.0);");
        assert!(main
            .insts()
            .any(|i| matches!(i, Inst::Store { value: Value::VectorConst(c), .. } if c == &vec![1.0, 2.0, 3.0])));
        assert_eq!(count(&main, |i| matches!(i, Inst::InsertLane { .. })), 3);
    }

    #[test]
    fn test_call_converts_arguments() {
        let module = module("float f(float x) { return x; } void main() { f(1); }");
        let main = module.function("main").unwrap();
        assert!(main.insts().any(|i| matches!(
            i,
            Inst::Call { func, args, .. } if func == "f" && args == &vec![Value::FloatConst(1.0)]
        )));
    }

    #[test]
    fn test_conditional_joins_through_slot() {
        let main = main_of("float f; bool b; f = b ? 1 : 2.0;");
        let end = main.block_by_name("cond.end").unwrap();
        assert!(matches!(end.insts.first(), Some(Inst::Load { .. })));
        let then = main.block_by_name("cond.then").unwrap();
        assert!(matches!(then.terminator, Some(Terminator::Branch(id)) if id == end.id));
        assert!(matches!(then.insts.first(), Some(Inst::Store { value: Value::FloatConst(_), .. })));
        assert!(main
            .entry()
            .unwrap()
            .insts
            .iter()
            .any(|i| matches!(i, Inst::Alloca { name, .. } if name == "cond")));
    }
}
