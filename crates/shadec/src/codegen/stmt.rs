//! Statement lowering and control flow

use tracing::trace;

use super::{CodeGen, Frame};
use crate::common::{CompileError, CompileResult};
use crate::frontend::ast::*;
use crate::ir::BlockId;
use crate::types::Type;

impl<'ast> CodeGen<'ast> {
    pub(super) fn emit_block(&mut self, block: &'ast Block) -> CompileResult<()> {
        self.symbols.push();
        for stmt in &block.stmts {
            self.emit_stmt(stmt)?;
        }
        self.symbols.pop();
        Ok(())
    }

    /// Emit `stmt` in a scope of its own
    fn emit_scoped(&mut self, stmt: &'ast Stmt) -> CompileResult<()> {
        self.symbols.push();
        self.emit_stmt(stmt)?;
        self.symbols.pop();
        Ok(())
    }

    /// Emit a loop or switch body with its break/continue targets in place
    fn emit_in_frame(&mut self, frame: Frame, body: impl FnOnce(&mut Self) -> CompileResult<()>) -> CompileResult<()> {
        self.frames.push(frame);
        let result = body(self);
        self.frames.pop();
        result
    }

    /// Branch to `target` unless the current block already left
    fn branch_if_open(&mut self, target: BlockId) -> CompileResult<()> {
        if self.builder.is_terminated() {
            Ok(())
        } else {
            self.builder.branch(target)
        }
    }

    pub(super) fn emit_stmt(&mut self, stmt: &'ast Stmt) -> CompileResult<()> {
        // Code after break/continue/return still needs a block to live in
        if self.builder.is_terminated() {
            let dead = self.builder.create_block("dead")?;
            self.builder.position_at_end(dead);
        }

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.emit_expr(expr)?;
                Ok(())
            }
            StmtKind::Empty => Ok(()),
            StmtKind::Decl(var) => self.emit_local(var),
            StmtKind::Block(block) => self.emit_block(block),

            StmtKind::If { test, then_branch, else_branch } => {
                self.emit_if(test, then_branch, else_branch.as_deref())
            }
            StmtKind::While { test, body } => self.emit_while(test, body),
            StmtKind::For { init, test, step, body } => {
                self.emit_for(init.as_ref(), test.as_ref(), step.as_ref(), body)
            }
            StmtKind::Switch { value, arms } => self.emit_switch(value, arms),

            StmtKind::Break => {
                let frame = self
                    .frames
                    .last()
                    .ok_or_else(|| CompileError::codegen("break outside of a loop or switch"))?;
                let target = frame.break_to;
                self.builder.branch(target)
            }

            StmtKind::Continue => {
                let target = self
                    .frames
                    .iter()
                    .rev()
                    .find_map(|frame| frame.continue_to)
                    .ok_or_else(|| CompileError::codegen("continue outside of a loop"))?;
                self.builder.branch(target)
            }

            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => {
                        let typed = self.emit_expr(expr)?;
                        let expected = self.current_return.clone();
                        if expected.is_void() {
                            None
                        } else {
                            Some(self.coerce(typed, &expected)?)
                        }
                    }
                    None => None,
                };
                self.builder.ret(value)
            }
        }
    }

    fn emit_if(&mut self, test: &'ast Expr, then_branch: &'ast Stmt, else_branch: Option<&'ast Stmt>) -> CompileResult<()> {
        let cond = self.emit_condition(test)?;

        let then_block = self.builder.create_block("if.then")?;
        let else_block = match else_branch {
            Some(_) => Some(self.builder.create_block("if.else")?),
            None => None,
        };
        let footer = self.builder.create_block("if.footer")?;
        self.builder.cond_branch(cond, then_block, else_block.unwrap_or(footer))?;

        self.builder.position_at_end(then_block);
        self.emit_scoped(then_branch)?;
        self.branch_if_open(footer)?;

        if let (Some(block), Some(stmt)) = (else_block, else_branch) {
            self.builder.position_at_end(block);
            self.emit_scoped(stmt)?;
            self.branch_if_open(footer)?;
        }

        self.builder.position_at_end(footer);
        Ok(())
    }

    fn emit_while(&mut self, test: &'ast Expr, body: &'ast Stmt) -> CompileResult<()> {
        let head = self.builder.create_block("while.head")?;
        let body_block = self.builder.create_block("while.body")?;
        let footer = self.builder.create_block("while.footer")?;
        self.builder.branch(head)?;

        self.builder.position_at_end(head);
        let cond = self.emit_condition(test)?;
        self.builder.cond_branch(cond, body_block, footer)?;

        self.builder.position_at_end(body_block);
        let frame = Frame {
            break_to: footer,
            continue_to: Some(head),
        };
        self.emit_in_frame(frame, |this| this.emit_scoped(body))?;
        self.branch_if_open(head)?;

        self.builder.position_at_end(footer);
        Ok(())
    }

    fn emit_for(
        &mut self,
        init: Option<&'ast ForInit>,
        test: Option<&'ast Expr>,
        step: Option<&'ast Expr>,
        body: &'ast Stmt,
    ) -> CompileResult<()> {
        self.symbols.push();
        match init {
            Some(ForInit::Expr(expr)) => {
                self.emit_expr(expr)?;
            }
            Some(ForInit::Decl(var)) => self.emit_local(var)?,
            None => {}
        }

        let head = self.builder.create_block("for.head")?;
        let body_block = self.builder.create_block("for.body")?;
        let step_block = match step {
            Some(_) => Some(self.builder.create_block("for.step")?),
            None => None,
        };
        let footer = self.builder.create_block("for.footer")?;
        self.builder.branch(head)?;

        self.builder.position_at_end(head);
        match test {
            Some(test) => {
                let cond = self.emit_condition(test)?;
                self.builder.cond_branch(cond, body_block, footer)?;
            }
            None => self.builder.branch(body_block)?,
        }

        // Without a step, `continue` re-tests at the head
        let next = step_block.unwrap_or(head);
        self.builder.position_at_end(body_block);
        let frame = Frame {
            break_to: footer,
            continue_to: Some(next),
        };
        self.emit_in_frame(frame, |this| this.emit_scoped(body))?;
        self.branch_if_open(next)?;

        if let (Some(block), Some(step)) = (step_block, step) {
            self.builder.position_at_end(block);
            self.emit_expr(step)?;
            self.builder.branch(head)?;
        }

        self.builder.position_at_end(footer);
        self.symbols.pop();
        Ok(())
    }

    fn emit_switch(&mut self, value: &'ast Expr, arms: &'ast [SwitchArm]) -> CompileResult<()> {
        let value = self.emit_expr(value)?;
        let value = self.coerce(value, &Type::Int)?;

        let mut blocks = Vec::with_capacity(arms.len());
        for arm in arms {
            let prefix = if arm.is_default() { "switch.default" } else { "switch.case" };
            blocks.push(self.builder.create_block(prefix)?);
        }
        let footer = self.builder.create_block("switch.footer")?;

        let mut cases = Vec::new();
        let mut default = footer;
        for (arm, &block) in arms.iter().zip(&blocks) {
            match &arm.label {
                Some(label) => {
                    let n = label
                        .const_int()
                        .ok_or_else(|| CompileError::codegen("case label is not an integer constant"))?;
                    cases.push((n, block));
                }
                None => default = block,
            }
        }
        trace!(cases = cases.len(), "switch dispatch");
        self.builder.switch(value, default, cases)?;

        let frame = Frame {
            break_to: footer,
            continue_to: None,
        };
        self.emit_in_frame(frame, |this| {
            for (i, (arm, &block)) in arms.iter().zip(&blocks).enumerate() {
                this.builder.position_at_end(block);
                this.symbols.push();
                for stmt in &arm.body {
                    this.emit_stmt(stmt)?;
                }
                this.symbols.pop();
                // Fall through into the next arm
                let next = blocks.get(i + 1).copied().unwrap_or(footer);
                this.branch_if_open(next)?;
            }
            Ok(())
        })?;

        self.builder.position_at_end(footer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::tests::module;
    use crate::codegen::{CodeGen, DEFAULT_MODULE_NAME};
    use crate::common::Span;
    use crate::ir::{IrFunction, Terminator, Value};

    fn main_of(body: &str) -> IrFunction {
        let module = module(&format!("void main() {{ {} }}", body));
        module.function("main").unwrap().clone()
    }

    fn block_id(func: &IrFunction, name: &str) -> BlockId {
        func.block_by_name(name).unwrap().id
    }

    fn terminator<'f>(func: &'f IrFunction, name: &str) -> &'f Terminator {
        func.block_by_name(name).unwrap().terminator.as_ref().unwrap()
    }

    #[test]
    fn test_every_block_terminated() {
        let module = module(
            "int f(int n) {
                 int s = 0;
                 while (n > 0) { if (n == 3) break; s += n; n--; continue; s = 0; }
                 for (;;) { return s; }
                 switch (n) { case 1: return 1; default: break; }
                 return s;
             }",
        );
        let f = module.function("f").unwrap();
        assert!(f.blocks.iter().all(|b| b.is_terminated()));
        assert!(f.block_by_name("dead").is_some());
    }

    #[test]
    fn test_if_else_blocks() {
        let main = main_of("int x; if (x < 1) { x = 1; } else { x = 2; }");
        let then = block_id(&main, "if.then");
        let else_ = block_id(&main, "if.else");
        let footer = block_id(&main, "if.footer");
        assert!(matches!(
            terminator(&main, "entry"),
            Terminator::CondBranch { then_block, else_block, .. } if *then_block == then && *else_block == else_
        ));
        assert_eq!(terminator(&main, "if.then"), &Terminator::Branch(footer));
        assert_eq!(terminator(&main, "if.else"), &Terminator::Branch(footer));
    }

    #[test]
    fn test_if_without_else_falls_to_footer() {
        let main = main_of("if (true) { }");
        let footer = block_id(&main, "if.footer");
        assert!(main.block_by_name("if.else").is_none());
        assert!(matches!(
            terminator(&main, "entry"),
            Terminator::CondBranch { else_block, .. } if *else_block == footer
        ));
    }

    #[test]
    fn test_while_loop_shape() {
        let main = main_of("int i; while (i < 3) { i++; }");
        let head = block_id(&main, "while.head");
        let body = block_id(&main, "while.body");
        let footer = block_id(&main, "while.footer");
        assert_eq!(terminator(&main, "entry"), &Terminator::Branch(head));
        assert!(matches!(
            terminator(&main, "while.head"),
            Terminator::CondBranch { then_block, else_block, .. } if *then_block == body && *else_block == footer
        ));
        assert_eq!(terminator(&main, "while.body"), &Terminator::Branch(head));
    }

    #[test]
    fn test_for_without_step_continues_at_head() {
        let main = main_of("int i; for (i = 0; i < 4; ) { continue; }");
        assert!(main.block_by_name("for.step").is_none());
        let head = block_id(&main, "for.head");
        assert!(main.block_by_name("for.body").is_some());
        assert!(main.block_by_name("for.footer").is_some());
        assert_eq!(terminator(&main, "for.body"), &Terminator::Branch(head));
    }

    #[test]
    fn test_for_with_step() {
        let main = main_of("int i; for (int j = 0; j < 4; j++) { if (j == 2) continue; i += j; }");
        let head = block_id(&main, "for.head");
        let step = block_id(&main, "for.step");
        assert_eq!(terminator(&main, "for.step"), &Terminator::Branch(head));
        assert_eq!(terminator(&main, "if.then"), &Terminator::Branch(step));
    }

    #[test]
    fn test_for_without_test_enters_body() {
        let main = main_of("for (;;) { break; }");
        let body = block_id(&main, "for.body");
        let footer = block_id(&main, "for.footer");
        assert_eq!(terminator(&main, "for.head"), &Terminator::Branch(body));
        assert_eq!(terminator(&main, "for.body"), &Terminator::Branch(footer));
    }

    #[test]
    fn test_switch_fallthrough_in_source_order() {
        let main = main_of("int x; switch (x) { case 1: x = 10; case 2: x = 20; break; default: x = 0; }");
        let case1 = block_id(&main, "switch.case");
        let case2 = block_id(&main, "switch.case.1");
        let default = block_id(&main, "switch.default");
        let footer = block_id(&main, "switch.footer");

        match terminator(&main, "entry") {
            Terminator::Switch { default: d, cases, .. } => {
                assert_eq!(*d, default);
                assert_eq!(cases, &vec![(1, case1), (2, case2)]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(terminator(&main, "switch.case"), &Terminator::Branch(case2));
        assert_eq!(terminator(&main, "switch.case.1"), &Terminator::Branch(footer));
        assert_eq!(terminator(&main, "switch.default"), &Terminator::Branch(footer));
    }

    #[test]
    fn test_switch_without_default_dispatches_to_footer() {
        let main = main_of("switch (2) { case -1: break; }");
        let footer = block_id(&main, "switch.footer");
        assert!(matches!(
            terminator(&main, "entry"),
            Terminator::Switch { default, cases, .. } if *default == footer && cases[0].0 == -1
        ));
    }

    #[test]
    fn test_continue_in_switch_targets_loop() {
        let main = main_of("int i; while (i < 3) { switch (i) { case 0: continue; } i++; }");
        let head = block_id(&main, "while.head");
        assert_eq!(terminator(&main, "switch.case"), &Terminator::Branch(head));
    }

    #[test]
    fn test_return_converts_value() {
        let module = module("float f() { return 1; }");
        let f = module.function("f").unwrap();
        assert_eq!(
            f.entry().unwrap().terminator,
            Some(Terminator::Return(Some(Value::FloatConst(1.0))))
        );
    }

    #[test]
    fn test_break_without_frame_is_internal_error() {
        let stmt = Stmt::new(StmtKind::Break, Span::new(0, 6));
        let mut codegen = CodeGen::new(DEFAULT_MODULE_NAME);
        codegen
            .builder
            .begin_function("f", vec![], crate::types::IrType::void())
            .unwrap();
        let entry = codegen.builder.create_block("entry").unwrap();
        codegen.builder.position_at_end(entry);
        assert!(matches!(codegen.emit_stmt(&stmt), Err(CompileError::Codegen { .. })));

        let stmt = Stmt::new(StmtKind::Continue, Span::new(0, 9));
        assert!(matches!(codegen.emit_stmt(&stmt), Err(CompileError::Codegen { .. })));
    }
}
