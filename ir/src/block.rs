use crate::Inst;

#[derive(Clone, Debug, Default)]
pub struct BasicBlockData {
    /// Instructions in order; the last entry, if any, is expected to be
    /// a terminator once the block is well-formed.
    pub insts: Vec<Inst>,
    /// Exception-handling landing pad. FunctionGate rejects functions
    /// containing one of these (spec.md §4.4).
    pub is_pad: bool,
}
