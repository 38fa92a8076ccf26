use cranelift_entity::PrimaryMap;

use crate::block::BasicBlockData;
use crate::global::Linkage;
use crate::instruction::{InstructionData, Opcode};
use crate::types::Type;
use crate::value::{Use, Value};
use crate::{Block, Inst};

/// Dispatcher-related bookkeeping the Flattener leaves behind so the
/// verifier (and `cff::flatten`'s own rollback check) can confirm the
/// dispatcher shape without re-deriving it from scratch.
#[derive(Clone, Copy, Debug)]
pub struct FlattenInfo {
    pub dispatch: Block,
    pub default: Block,
    pub state_slot: Inst,
}

/// An ordered set of basic blocks with a distinguished entry (spec.md §3).
///
/// Erasure is tombstone-style: `erase_block`/`erase_inst` drop an id from
/// the function's live ordering but leave its slot allocated in the arena,
/// so any `Inst`/`Block` captured before the erasure remains a valid (if
/// now-orphaned) key rather than dangling. This mirrors how arena-backed
/// compiler IRs (e.g. cranelift's `DataFlowGraph`) treat dead code.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub is_declaration: bool,
    pub is_intrinsic: bool,
    pub params: Vec<Type>,
    pub ret_ty: Option<Type>,
    entry: Block,
    block_order: Vec<Block>,
    blocks: PrimaryMap<Block, BasicBlockData>,
    insts: PrimaryMap<Inst, InstructionData>,
    /// Present once `cff::flatten` has rewritten this function.
    pub flatten_info: Option<FlattenInfo>,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<Type>, ret_ty: Option<Type>) -> Self {
        let mut blocks = PrimaryMap::new();
        let entry = blocks.push(BasicBlockData::default());
        Function {
            name: name.into(),
            linkage: Linkage::Internal,
            is_declaration: false,
            is_intrinsic: false,
            params,
            ret_ty,
            entry,
            block_order: vec![entry],
            blocks,
            insts: PrimaryMap::new(),
            flatten_info: None,
        }
    }

    /// A declaration has no body to transform; gated out by FunctionGate.
    pub fn declaration(name: impl Into<String>, params: Vec<Type>, ret_ty: Option<Type>) -> Self {
        let mut f = Function::new(name, params, ret_ty);
        f.is_declaration = true;
        f
    }

    pub fn entry(&self) -> Block {
        self.entry
    }

    pub fn set_entry(&mut self, block: Block) {
        self.entry = block;
    }

    /// Live blocks, in their current order. Position 0 is always the entry.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.block_order.iter().copied()
    }

    pub fn block_count(&self) -> usize {
        self.block_order.len()
    }

    pub fn block(&self, b: Block) -> &BasicBlockData {
        &self.blocks[b]
    }

    pub fn block_mut(&mut self, b: Block) -> &mut BasicBlockData {
        &mut self.blocks[b]
    }

    pub fn create_block(&mut self) -> Block {
        let b = self.blocks.push(BasicBlockData::default());
        self.block_order.push(b);
        b
    }

    /// Removes `block` from the live ordering. Does not check whether it
    /// is still referenced as a successor; callers erase dead blocks only
    /// after rewiring every predecessor, per the flattener's contract.
    pub fn erase_block(&mut self, block: Block) {
        self.block_order.retain(|&b| b != block);
    }

    pub fn inst(&self, i: Inst) -> &InstructionData {
        &self.insts[i]
    }

    pub fn inst_mut(&mut self, i: Inst) -> &mut InstructionData {
        &mut self.insts[i]
    }

    pub fn opcode(&self, i: Inst) -> &Opcode {
        &self.insts[i].opcode
    }

    pub fn parent_block(&self, i: Inst) -> Block {
        self.insts[i].block
    }

    /// Allocates an instruction not yet attached to any block.
    fn new_inst(&mut self, block: Block, opcode: Opcode) -> Inst {
        self.insts.push(InstructionData { opcode, block })
    }

    pub fn append_inst(&mut self, block: Block, opcode: Opcode) -> Inst {
        let inst = self.new_inst(block, opcode);
        self.blocks[block].insts.push(inst);
        inst
    }

    /// Inserts a new instruction with the given opcode immediately before
    /// `before`, in `before`'s block.
    pub fn insert_before(&mut self, before: Inst, opcode: Opcode) -> Inst {
        let block = self.insts[before].block;
        let inst = self.new_inst(block, opcode);
        let insts = &mut self.blocks[block].insts;
        let pos = insts.iter().position(|&i| i == before).expect("before not in its own block");
        insts.insert(pos, inst);
        inst
    }

    /// Inserts at the very start of `block` (used for the entry's `state`
    /// alloca and for phi-slot poison stores that must dominate everything).
    pub fn insert_at_block_start(&mut self, block: Block, opcode: Opcode) -> Inst {
        let inst = self.new_inst(block, opcode);
        self.blocks[block].insts.insert(0, inst);
        inst
    }

    /// Removes `inst` from its block's instruction list. The arena slot is
    /// kept (tombstoned) so any stray reference doesn't panic, only becomes
    /// unreachable via block iteration.
    pub fn erase_inst(&mut self, inst: Inst) {
        let block = self.insts[inst].block;
        self.blocks[block].insts.retain(|&i| i != inst);
    }

    pub fn replace_terminator(&mut self, block: Block, opcode: Opcode) -> Inst {
        let insts = &self.blocks[block].insts;
        if let Some(&old) = insts.last() {
            if self.insts[old].opcode.is_terminator() {
                self.erase_inst(old);
            }
        }
        self.append_inst(block, opcode)
    }

    pub fn terminator(&self, block: Block) -> Option<Inst> {
        self.blocks[block].insts.last().copied()
    }

    /// Phi-nodes at the start of `block`, in declaration order. By
    /// convention phis precede every non-phi instruction in a block.
    pub fn phis_in(&self, block: Block) -> Vec<Inst> {
        self.blocks[block]
            .insts
            .iter()
            .copied()
            .take_while(|&i| self.insts[i].opcode.is_phi())
            .collect()
    }

    /// All non-phi, non-terminator instructions in `block`, in order.
    pub fn body_insts(&self, block: Block) -> Vec<Inst> {
        self.blocks[block]
            .insts
            .iter()
            .copied()
            .filter(|&i| {
                let op = &self.insts[i].opcode;
                !op.is_phi() && !op.is_terminator()
            })
            .collect()
    }

    pub fn successors(&self, block: Block) -> Vec<Block> {
        self.terminator(block)
            .map(|t| self.insts[t].opcode.successors())
            .unwrap_or_default()
    }

    /// Every block whose terminator lists `block` as a successor.
    /// Computed on demand by scanning; cheap relative to the cost of
    /// maintaining a bidirectional edge list through every CFG rewrite.
    pub fn predecessors(&self, block: Block) -> Vec<Block> {
        self.block_order
            .iter()
            .copied()
            .filter(|&b| self.successors(b).contains(&block))
            .collect()
    }

    /// Every use of `value` across the whole function, found by scanning
    /// every live instruction's operand list.
    pub fn uses_of_value(&self, value: Value) -> Vec<Use> {
        let mut uses = Vec::new();
        for &block in &self.block_order {
            for &inst in &self.blocks[block].insts {
                for (idx, operand) in self.insts[inst].opcode.operands().into_iter().enumerate() {
                    if operand == value {
                        uses.push(Use { user: inst, operand_index: idx });
                    }
                }
            }
        }
        uses
    }

    pub fn set_use(&mut self, u: Use, new_value: Value) {
        let operands = self.insts[u.user].opcode.operands_mut();
        *operands[u.operand_index] = new_value;
    }

    /// All instructions in the function, in block order, for verifier
    /// passes that need a flat walk.
    pub fn all_insts(&self) -> Vec<Inst> {
        self.block_order
            .iter()
            .flat_map(|&b| self.blocks[b].insts.iter().copied())
            .collect()
    }
}
