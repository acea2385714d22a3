//! Instruction builder with an insertion cursor.
//!
//! The cursor is either unset or positioned at the end of one basic block.
//! Every `build_*` call appends to that block and fails when the cursor is
//! unset or the block already ends in a terminator.

use crate::ir::ir::{BasicBlock, BinaryOp, BlockRef, FuncId, Instr, Module, Operand, ValueId};
use crate::ir::types::Ty;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("no insertion point set")]
    NoInsertionPoint,
    #[error("block '{block}' in function '{function}' is already terminated")]
    Terminated { function: String, block: String },
}

#[derive(Debug, Default)]
pub struct Builder {
    cursor: Option<BlockRef>,
}

impl Builder {
    pub fn new() -> Self {
        Self { cursor: None }
    }

    pub fn insertion_block(&self) -> Option<BlockRef> {
        self.cursor
    }

    pub fn position_at_end(&mut self, block: BlockRef) {
        self.cursor = Some(block);
    }

    pub fn clear_insertion_point(&mut self) {
        self.cursor = None;
    }

    /// Append a new, empty block to `func`.
    pub fn append_block(module: &mut Module, func: FuncId, label: &str) -> BlockRef {
        let function = module.function_mut(func);
        let label = function.fresh_name(label);
        function.blocks.push(BasicBlock {
            label,
            instrs: Vec::new(),
        });
        BlockRef {
            func,
            block: function.blocks.len() - 1,
        }
    }

    fn cursor(&self, module: &Module) -> Result<BlockRef, BuildError> {
        let at = self.cursor.ok_or(BuildError::NoInsertionPoint)?;
        let function = module.function(at.func);
        let block = &function.blocks[at.block];
        if block.is_terminated() {
            return Err(BuildError::Terminated {
                function: function.name.clone(),
                block: block.label.clone(),
            });
        }
        Ok(at)
    }

    fn push(&self, module: &mut Module, at: BlockRef, instr: Instr) {
        trace!(function = %module.function(at.func).name, ?instr, "emit");
        module.function_mut(at.func).blocks[at.block]
            .instrs
            .push(instr);
    }

    /// Allocate a result value in the current function and emit the
    /// instruction producing it.
    fn push_value(
        &self,
        module: &mut Module,
        name: &str,
        ty: Ty,
        make: impl FnOnce(ValueId) -> Instr,
    ) -> Result<Operand, BuildError> {
        let at = self.cursor(module)?;
        let id = module.function_mut(at.func).new_value(name, ty);
        self.push(module, at, make(id));
        Ok(Operand::Local { id, ty })
    }

    pub fn build_alloca(
        &mut self,
        module: &mut Module,
        ty: Ty,
        name: &str,
    ) -> Result<Operand, BuildError> {
        self.push_value(module, name, Ty::Ptr, |dst| Instr::Alloca { dst, ty })
    }

    pub fn build_load(
        &mut self,
        module: &mut Module,
        ty: Ty,
        ptr: Operand,
        name: &str,
    ) -> Result<Operand, BuildError> {
        self.push_value(module, name, ty, |dst| Instr::Load { dst, ty, ptr })
    }

    pub fn build_store(
        &mut self,
        module: &mut Module,
        value: Operand,
        ptr: Operand,
    ) -> Result<(), BuildError> {
        let at = self.cursor(module)?;
        self.push(module, at, Instr::Store { value, ptr });
        Ok(())
    }

    pub fn build_binary(
        &mut self,
        module: &mut Module,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
        name: &str,
    ) -> Result<Operand, BuildError> {
        let ty = lhs.ty();
        self.push_value(module, name, ty, |dst| Instr::Binary { dst, op, lhs, rhs })
    }

    pub fn build_sext(
        &mut self,
        module: &mut Module,
        value: Operand,
        to: Ty,
        name: &str,
    ) -> Result<Operand, BuildError> {
        self.push_value(module, name, to, |dst| Instr::SExt { dst, value, to })
    }

    pub fn build_call(
        &mut self,
        module: &mut Module,
        callee: FuncId,
        args: Vec<Operand>,
        name: &str,
    ) -> Result<Operand, BuildError> {
        let ret = module.function(callee).ret;
        self.push_value(module, name, ret, |dst| Instr::Call { dst, callee, args })
    }

    pub fn build_ret(&mut self, module: &mut Module, value: Operand) -> Result<(), BuildError> {
        let at = self.cursor(module)?;
        self.push(module, at, Instr::Ret { value });
        Ok(())
    }
}
