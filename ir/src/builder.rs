use crate::function::Function;
use crate::instruction::{Callee, IcmpPred, Opcode};
use crate::types::Type;
use crate::value::Value;
use crate::{Block, Inst};

/// Where newly built instructions land, relative to an existing
/// instruction or a block's start (spec.md §6's "insert at a builder
/// cursor positioned by an instruction or a block-begin").
#[derive(Clone, Copy, Debug)]
pub enum Cursor {
    Before(Inst),
    AtBlockStart(Block),
    AtBlockEnd(Block),
}

/// Scoped instruction builder. Its lifetime is shorter than the function
/// it mutates, per spec.md §5's resource-lifetime rule.
pub struct Builder<'f> {
    func: &'f mut Function,
    cursor: Cursor,
}

impl<'f> Builder<'f> {
    pub fn new(func: &'f mut Function, cursor: Cursor) -> Self {
        Builder { func, cursor }
    }

    fn block_of_cursor(&self) -> Block {
        match self.cursor {
            Cursor::Before(i) => self.func.parent_block(i),
            Cursor::AtBlockStart(b) | Cursor::AtBlockEnd(b) => b,
        }
    }

    fn emit(&mut self, opcode: Opcode) -> Inst {
        match self.cursor {
            Cursor::Before(i) => self.func.insert_before(i, opcode),
            Cursor::AtBlockStart(b) => {
                let inst = self.func.insert_at_block_start(b, opcode);
                // Keep inserting in-order on repeated builder calls: once
                // the first instruction lands, subsequent ones should
                // follow it rather than all piling up at index 0.
                self.cursor = Cursor::Before(self.first_after(b, inst));
                inst
            }
            Cursor::AtBlockEnd(b) => self.func.append_inst(b, opcode),
        }
    }

    fn first_after(&self, block: Block, inst: Inst) -> Inst {
        let insts = &self.func.block(block).insts;
        let pos = insts.iter().position(|&i| i == inst).unwrap();
        insts.get(pos + 1).copied().unwrap_or(inst)
    }

    pub fn alloca(&mut self, ty: Type, count: u32) -> Value {
        let i = self.emit(Opcode::Alloca { ty, count });
        Value::Inst(i)
    }

    pub fn load(&mut self, ty: Type, ptr: Value) -> Value {
        let i = self.emit(Opcode::Load { ty, ptr });
        Value::Inst(i)
    }

    pub fn store(&mut self, value: Value, ptr: Value) {
        self.emit(Opcode::Store { value, ptr });
    }

    pub fn gep(&mut self, base: Value, indices: Vec<Value>) -> Value {
        let i = self.emit(Opcode::Gep { base, indices });
        Value::Inst(i)
    }

    pub fn bitcast(&mut self, value: Value, to: Type) -> Value {
        let i = self.emit(Opcode::Bitcast { value, to });
        Value::Inst(i)
    }

    pub fn call(&mut self, callee: Callee, args: Vec<Value>, result_ty: Option<Type>) -> Option<Value> {
        let i = self.emit(Opcode::Call { callee, args, result_ty });
        result_ty.map(|_| Value::Inst(i))
    }

    pub fn icmp(&mut self, pred: IcmpPred, lhs: Value, rhs: Value) -> Value {
        let i = self.emit(Opcode::Icmp { pred, lhs, rhs });
        Value::Inst(i)
    }

    pub fn select(&mut self, ty: Type, cond: Value, if_true: Value, if_false: Value) -> Value {
        let i = self.emit(Opcode::Select { ty, cond, if_true, if_false });
        Value::Inst(i)
    }

    pub fn xor(&mut self, ty: Type, lhs: Value, rhs: Value) -> Value {
        let i = self.emit(Opcode::Xor { ty, lhs, rhs });
        Value::Inst(i)
    }

    pub fn add(&mut self, ty: Type, lhs: Value, rhs: Value) -> Value {
        let i = self.emit(Opcode::Add { ty, lhs, rhs });
        Value::Inst(i)
    }

    pub fn br(&mut self, target: Block) -> Inst {
        self.emit(Opcode::Br { target })
    }

    pub fn cond_br(&mut self, cond: Value, then_block: Block, else_block: Block) -> Inst {
        self.emit(Opcode::CondBr { cond, then_block, else_block })
    }

    pub fn switch(&mut self, cond: Value, default: Block, cases: Vec<(i64, Block)>) -> Inst {
        self.emit(Opcode::Switch { cond, default, cases })
    }

    pub fn ret(&mut self, value: Option<Value>) -> Inst {
        self.emit(Opcode::Ret { value })
    }

    pub fn unreachable(&mut self) -> Inst {
        self.emit(Opcode::Unreachable)
    }

    pub fn phi(&mut self, ty: Type, incomings: Vec<(Value, Block)>) -> Value {
        let i = self.emit(Opcode::Phi { ty, incomings });
        Value::Inst(i)
    }

    pub fn current_block(&self) -> Block {
        self.block_of_cursor()
    }
}
