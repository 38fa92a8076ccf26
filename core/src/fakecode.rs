//! Fake-code insertion (spec.md §1): a stylistic transformation with no
//! correctness subtleties beyond "branch guarded by a constant-false
//! predicate". Out of scope as a designed component; this is the
//! minimal stub spec.md's ambient stub rule asks for. Never called by
//! [`crate::driver::Driver::run`] — a host wires it in only when its own
//! config enables it.

use chakravyuha_ir::{Block, Builder, ConstantData, Cursor, Function, Module, Opcode, Type, Value};

/// Replaces `block`'s unconditional-branch terminator with a branch on a
/// constant-false predicate between a freshly created unreachable block
/// and the original target. Returns `false` (no-op) if `block` doesn't
/// end in an unconditional branch.
pub fn insert_dead_branch(module: &mut Module, func: &mut Function, block: Block) -> bool {
    let Some(term) = func.terminator(block) else {
        return false;
    };
    let Opcode::Br { target } = func.opcode(term).clone() else {
        return false;
    };

    let dead = func.create_block();
    Builder::new(func, Cursor::AtBlockEnd(dead)).unreachable();
    let always_false = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I1, value: 0 }));
    func.replace_terminator(block, Opcode::CondBr { cond: always_false, then_block: dead, else_block: target });
    true
}
