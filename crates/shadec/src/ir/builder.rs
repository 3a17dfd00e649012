//! IR builder
//!
//! Owns the module under construction, the function being filled and the
//! insertion point. Every emitting method appends to the block at the
//! insertion point; appending to a terminated block is an internal error.

use std::collections::HashMap;

use tracing::trace;

use super::inst::*;
use crate::common::{CompileError, CompileResult};
use crate::types::IrType;

pub struct IrBuilder {
    module: IrModule,
    current_func: Option<IrFunction>,
    insert_block: Option<BlockId>,
    temp_counter: u32,
    block_names: HashMap<String, usize>,
}

impl IrBuilder {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module: IrModule::new(module_name),
            current_func: None,
            insert_block: None,
            temp_counter: 0,
            block_names: HashMap::new(),
        }
    }

    /// Add a module-level variable, replacing any of the same name
    pub fn add_global(&mut self, name: impl Into<String>, ty: IrType, init: Option<Value>) -> Value {
        let name = name.into();
        self.module.globals.retain(|g| g.name != name);
        self.module.globals.push(IrGlobal {
            name: name.clone(),
            ty,
            init,
        });
        Value::Global(name)
    }

    /// Start filling a new function; block names and temps restart
    pub fn begin_function(
        &mut self,
        name: impl Into<String>,
        params: Vec<(String, IrType)>,
        return_type: IrType,
    ) -> CompileResult<()> {
        if let Some(open) = &self.current_func {
            return Err(CompileError::codegen(format!(
                "function '{}' still open",
                open.name
            )));
        }
        self.current_func = Some(IrFunction::new(name, params, return_type));
        self.insert_block = None;
        self.temp_counter = 0;
        self.block_names.clear();
        Ok(())
    }

    /// Close the current function and add it to the module
    pub fn finish_function(&mut self) -> CompileResult<()> {
        let func = self
            .current_func
            .take()
            .ok_or_else(|| CompileError::codegen("no open function"))?;
        if let Some(block) = func.blocks.iter().find(|b| !b.is_terminated()) {
            return Err(CompileError::codegen(format!(
                "block '{}' in '{}' has no terminator",
                block.name, func.name
            )));
        }
        self.insert_block = None;
        self.module.functions.retain(|f| f.name != func.name);
        self.module.functions.push(func);
        Ok(())
    }

    /// Append a new empty block named after `prefix`
    ///
    /// Names are unique within a function: the second `if.then` is
    /// `if.then.1`.
    pub fn create_block(&mut self, prefix: &str) -> CompileResult<BlockId> {
        let count = self.block_names.entry(prefix.to_string()).or_insert(0);
        let name = if *count == 0 {
            prefix.to_string()
        } else {
            format!("{}.{}", prefix, count)
        };
        *count += 1;

        let func = self.func_mut()?;
        let id = BlockId(func.blocks.len());
        trace!(block = %name, "create block");
        func.blocks.push(BasicBlock::new(id, name));
        Ok(id)
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        self.insert_block = Some(block);
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.insert_block
    }

    /// Whether the block at the insertion point already has a terminator
    pub fn is_terminated(&self) -> bool {
        match (&self.current_func, self.insert_block) {
            (Some(func), Some(id)) => func.block(id).is_some_and(BasicBlock::is_terminated),
            _ => false,
        }
    }

    fn func_mut(&mut self) -> CompileResult<&mut IrFunction> {
        self.current_func
            .as_mut()
            .ok_or_else(|| CompileError::codegen("no open function"))
    }

    fn block_mut(&mut self) -> CompileResult<&mut BasicBlock> {
        let id = self
            .insert_block
            .ok_or_else(|| CompileError::codegen("no insertion block"))?;
        self.func_mut()?
            .block_mut(id)
            .ok_or_else(|| CompileError::codegen(format!("unknown block {}", id.0)))
    }

    fn new_temp(&mut self) -> Temp {
        let t = Temp(self.temp_counter);
        self.temp_counter += 1;
        t
    }

    fn emit(&mut self, inst: Inst) -> CompileResult<()> {
        let block = self.block_mut()?;
        if block.is_terminated() {
            return Err(CompileError::codegen(format!(
                "instruction after terminator in '{}'",
                block.name
            )));
        }
        block.insts.push(inst);
        Ok(())
    }

    fn terminate(&mut self, term: Terminator) -> CompileResult<()> {
        let block = self.block_mut()?;
        if block.is_terminated() {
            return Err(CompileError::codegen(format!(
                "block '{}' is already terminated",
                block.name
            )));
        }
        block.terminator = Some(term);
        Ok(())
    }

    pub fn alloca(&mut self, ty: IrType, name: &str) -> CompileResult<Value> {
        let dst = self.new_temp();
        self.emit(Inst::Alloca {
            dst,
            ty,
            name: name.to_string(),
        })?;
        Ok(Value::Temp(dst))
    }

    /// Stack slot appended to `block`, which may already be terminated
    pub fn alloca_in(&mut self, block: BlockId, ty: IrType, name: &str) -> CompileResult<Value> {
        let dst = self.new_temp();
        self.func_mut()?
            .block_mut(block)
            .ok_or_else(|| CompileError::codegen(format!("unknown block {}", block.0)))?
            .insts
            .push(Inst::Alloca {
                dst,
                ty,
                name: name.to_string(),
            });
        Ok(Value::Temp(dst))
    }

    pub fn load(&mut self, ty: IrType, addr: Value) -> CompileResult<Value> {
        let dst = self.new_temp();
        self.emit(Inst::Load { dst, ty, addr })?;
        Ok(Value::Temp(dst))
    }

    pub fn store(&mut self, addr: Value, value: Value) -> CompileResult<()> {
        self.emit(Inst::Store { addr, value })
    }

    pub fn binary(&mut self, op: BinOp, ty: IrType, left: Value, right: Value) -> CompileResult<Value> {
        let dst = self.new_temp();
        self.emit(Inst::Binary {
            dst,
            op,
            ty,
            left,
            right,
        })?;
        Ok(Value::Temp(dst))
    }

    pub fn cmp(&mut self, pred: CmpPred, left: Value, right: Value) -> CompileResult<Value> {
        let dst = self.new_temp();
        self.emit(Inst::Cmp {
            dst,
            pred,
            left,
            right,
        })?;
        Ok(Value::Temp(dst))
    }

    /// Scalar conversion; integer constants are converted in place
    pub fn convert(&mut self, op: ConvOp, value: Value) -> CompileResult<Value> {
        match (op, &value) {
            (ConvOp::IntToFloat, Value::IntConst(n)) => Ok(Value::FloatConst(*n as f64)),
            (ConvOp::FloatToInt, Value::FloatConst(x)) => Ok(Value::IntConst(*x as i64)),
            (ConvOp::BoolToInt, Value::BoolConst(b)) => Ok(Value::IntConst(i64::from(*b))),
            (ConvOp::BoolToFloat, Value::BoolConst(b)) => Ok(Value::FloatConst(f64::from(u8::from(*b)))),
            _ => {
                let dst = self.new_temp();
                self.emit(Inst::Convert { dst, op, value })?;
                Ok(Value::Temp(dst))
            }
        }
    }

    /// Read one lane; lanes of a constant vector are read directly
    pub fn extract_lane(&mut self, vector: Value, lane: u32) -> CompileResult<Value> {
        if let Value::VectorConst(lanes) = &vector {
            if let Some(x) = lanes.get(lane as usize) {
                return Ok(Value::FloatConst(*x));
            }
        }
        let dst = self.new_temp();
        self.emit(Inst::ExtractLane { dst, vector, lane })?;
        Ok(Value::Temp(dst))
    }

    pub fn insert_lane(&mut self, vector: Value, value: Value, lane: u32) -> CompileResult<Value> {
        let dst = self.new_temp();
        self.emit(Inst::InsertLane {
            dst,
            vector,
            value,
            lane,
        })?;
        Ok(Value::Temp(dst))
    }

    pub fn shuffle(&mut self, vector: Value, mask: Vec<u32>) -> CompileResult<Value> {
        let dst = self.new_temp();
        self.emit(Inst::Shuffle { dst, vector, mask })?;
        Ok(Value::Temp(dst))
    }

    pub fn element_ptr(&mut self, base: Value, index: Value) -> CompileResult<Value> {
        let dst = self.new_temp();
        self.emit(Inst::ElementPtr { dst, base, index })?;
        Ok(Value::Temp(dst))
    }

    /// Call `func`; a void call yields no value
    pub fn call(&mut self, func: &str, args: Vec<Value>, returns_value: bool) -> CompileResult<Option<Value>> {
        let dst = returns_value.then(|| self.new_temp());
        self.emit(Inst::Call {
            dst,
            func: func.to_string(),
            args,
        })?;
        Ok(dst.map(Value::Temp))
    }

    pub fn branch(&mut self, target: BlockId) -> CompileResult<()> {
        self.terminate(Terminator::Branch(target))
    }

    pub fn cond_branch(&mut self, cond: Value, then_block: BlockId, else_block: BlockId) -> CompileResult<()> {
        self.terminate(Terminator::CondBranch {
            cond,
            then_block,
            else_block,
        })
    }

    pub fn switch(&mut self, value: Value, default: BlockId, cases: Vec<(i64, BlockId)>) -> CompileResult<()> {
        self.terminate(Terminator::Switch {
            value,
            default,
            cases,
        })
    }

    pub fn ret(&mut self, value: Option<Value>) -> CompileResult<()> {
        self.terminate(Terminator::Return(value))
    }

    pub fn unreachable(&mut self) -> CompileResult<()> {
        self.terminate(Terminator::Unreachable)
    }

    /// Finished module
    pub fn finish(self) -> IrModule {
        self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(builder: &mut IrBuilder) -> BlockId {
        builder.begin_function("main", vec![], IrType::void()).unwrap();
        let entry = builder.create_block("entry").unwrap();
        builder.position_at_end(entry);
        entry
    }

    #[test]
    fn test_double_termination_is_error() {
        let mut builder = IrBuilder::new("test");
        open(&mut builder);
        builder.ret(None).unwrap();
        assert!(matches!(builder.ret(None), Err(CompileError::Codegen { .. })));
        assert!(builder.is_terminated());
    }

    #[test]
    fn test_emit_after_terminator_is_error() {
        let mut builder = IrBuilder::new("test");
        open(&mut builder);
        builder.unreachable().unwrap();
        assert!(builder.alloca(IrType::i32(), "x").is_err());
    }

    #[test]
    fn test_unterminated_block_rejected_on_finish() {
        let mut builder = IrBuilder::new("test");
        open(&mut builder);
        assert!(builder.finish_function().is_err());
    }

    #[test]
    fn test_block_names_unique() {
        let mut builder = IrBuilder::new("test");
        open(&mut builder);
        let a = builder.create_block("if.then").unwrap();
        let b = builder.create_block("if.then").unwrap();
        builder.ret(None).unwrap();
        builder.position_at_end(a);
        builder.ret(None).unwrap();
        builder.position_at_end(b);
        builder.ret(None).unwrap();
        builder.finish_function().unwrap();

        let module = builder.finish();
        let main = module.function("main").unwrap();
        assert!(main.block_by_name("if.then").is_some());
        assert!(main.block_by_name("if.then.1").is_some());
    }

    #[test]
    fn test_constant_folding_helpers() {
        let mut builder = IrBuilder::new("test");
        open(&mut builder);
        assert_eq!(
            builder.convert(ConvOp::IntToFloat, Value::IntConst(3)).unwrap(),
            Value::FloatConst(3.0)
        );
        assert_eq!(
            builder.convert(ConvOp::BoolToInt, Value::BoolConst(true)).unwrap(),
            Value::IntConst(1)
        );
        assert_eq!(
            builder.extract_lane(Value::VectorConst(vec![1.0, 2.0]), 1).unwrap(),
            Value::FloatConst(2.0)
        );
        builder.ret(None).unwrap();
        builder.finish_function().unwrap();
        assert!(builder.finish().functions[0].insts().next().is_none());
    }

    #[test]
    fn test_temps_restart_per_function() {
        let mut builder = IrBuilder::new("test");
        open(&mut builder);
        let first = builder.alloca(IrType::i32(), "a").unwrap();
        builder.ret(None).unwrap();
        builder.finish_function().unwrap();

        builder.begin_function("other", vec![], IrType::void()).unwrap();
        let entry = builder.create_block("entry").unwrap();
        builder.position_at_end(entry);
        let second = builder.alloca(IrType::i32(), "b").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_global_replaced_by_name() {
        let mut builder = IrBuilder::new("test");
        builder.add_global("g", IrType::i32(), Some(Value::IntConst(1)));
        builder.add_global("g", IrType::f32(), None);
        let module = builder.finish();
        assert_eq!(module.globals.len(), 1);
        assert_eq!(module.global("g").map(|g| g.ty.clone()), Some(IrType::f32()));
    }
}
