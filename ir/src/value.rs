use crate::{ConstantId, GlobalId, Inst};

/// Anything an instruction can take as an operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    /// The result produced by a (non-void) instruction.
    Inst(Inst),
    /// A function parameter, by index.
    Param(u32),
    /// An inline constant.
    Const(ConstantId),
    /// The address of a global variable.
    Global(GlobalId),
    /// A poison/undefined value: used by the demoter to initialize a
    /// phi's slot on paths that bypass all of the phi's predecessors.
    Undef,
}

/// A directed edge from a user instruction to an operand slot. Rewriting
/// a `Use` redirects that one operand without touching any other user of
/// the same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Use {
    pub user: Inst,
    pub operand_index: usize,
}
