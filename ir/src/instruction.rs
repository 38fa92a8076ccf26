use crate::{Block, FunctionId, Type, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IcmpPred {
    Eq,
    Ne,
    Slt,
    Sgt,
    Sle,
    Sge,
}

/// Either a call to another function defined in this module, or a call to
/// a named external/runtime routine the host provides (e.g. a `print`-like
/// function). The core never needs to inspect an extern callee's body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callee {
    Function(FunctionId),
    Extern(String),
}

/// The operation an instruction performs. Modeled as a tagged variant
/// rather than a trait-object hierarchy per spec.md's "terminator
/// polymorphism" design note: every rewrite is a match on this enum plus
/// a table lookup, never open-ended dispatch.
#[derive(Clone, Debug, PartialEq)]
pub enum Opcode {
    Alloca {
        ty: Type,
        /// Number of elements (>1 for a byte-buffer alloca).
        count: u32,
    },
    Load {
        ty: Type,
        ptr: Value,
    },
    Store {
        value: Value,
        ptr: Value,
    },
    /// Pointer arithmetic: `base + sum(indices)`. The obfuscator only ever
    /// emits single-index byte offsets; multi-index GEPs may appear in
    /// input modules and are treated opaquely (not rewritten).
    Gep {
        base: Value,
        indices: Vec<Value>,
    },
    Bitcast {
        value: Value,
        to: Type,
    },
    Call {
        callee: Callee,
        args: Vec<Value>,
        /// `None` for a void call.
        result_ty: Option<Type>,
    },
    /// Incoming `(value, predecessor block)` pairs, in the order the
    /// predecessors' terminators would assign them.
    Phi {
        ty: Type,
        incomings: Vec<(Value, Block)>,
    },
    Icmp {
        pred: IcmpPred,
        lhs: Value,
        rhs: Value,
    },
    Select {
        ty: Type,
        cond: Value,
        if_true: Value,
        if_false: Value,
    },
    Xor {
        ty: Type,
        lhs: Value,
        rhs: Value,
    },
    Add {
        ty: Type,
        lhs: Value,
        rhs: Value,
    },
    Br {
        target: Block,
    },
    CondBr {
        cond: Value,
        then_block: Block,
        else_block: Block,
    },
    Switch {
        cond: Value,
        default: Block,
        /// Case values in declaration order; iteration order here is the
        /// tie-break spec.md §4.6.1 requires for deterministic next-state
        /// construction.
        cases: Vec<(i64, Block)>,
    },
    Ret {
        value: Option<Value>,
    },
    Unreachable,
    /// Escape hatch for terminator shapes the core does not support
    /// (indirect branch, callbr, invoke). FunctionGate rejects any
    /// function containing one of these.
    UnsupportedTerminator {
        mnemonic: String,
    },
}

impl Opcode {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Opcode::Br { .. }
                | Opcode::CondBr { .. }
                | Opcode::Switch { .. }
                | Opcode::Ret { .. }
                | Opcode::Unreachable
                | Opcode::UnsupportedTerminator { .. }
        )
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, Opcode::Phi { .. })
    }

    pub fn is_alloca(&self) -> bool {
        matches!(self, Opcode::Alloca { .. })
    }

    /// The type of value this instruction produces, or `None` for
    /// void/terminator instructions.
    pub fn result_type(&self) -> Option<Type> {
        match self {
            Opcode::Alloca { .. } => Some(Type::Ptr),
            Opcode::Load { ty, .. } => Some(*ty),
            Opcode::Gep { .. } => Some(Type::Ptr),
            Opcode::Bitcast { to, .. } => Some(*to),
            Opcode::Call { result_ty, .. } => *result_ty,
            Opcode::Phi { ty, .. } => Some(*ty),
            Opcode::Icmp { .. } => Some(Type::I1),
            Opcode::Select { ty, .. } => Some(*ty),
            Opcode::Xor { ty, .. } => Some(*ty),
            Opcode::Add { ty, .. } => Some(*ty),
            Opcode::Store { .. }
            | Opcode::Br { .. }
            | Opcode::CondBr { .. }
            | Opcode::Switch { .. }
            | Opcode::Ret { .. }
            | Opcode::Unreachable
            | Opcode::UnsupportedTerminator { .. } => None,
        }
    }

    /// Successor blocks, in the exact order the spec's next-state
    /// construction rule (§4.6.1) iterates them.
    pub fn successors(&self) -> Vec<Block> {
        match self {
            Opcode::Br { target } => vec![*target],
            Opcode::CondBr { then_block, else_block, .. } => vec![*then_block, *else_block],
            Opcode::Switch { default, cases, .. } => {
                let mut v = vec![*default];
                v.extend(cases.iter().map(|(_, b)| *b));
                v
            }
            _ => vec![],
        }
    }

    /// Every `Value` this instruction reads, in a stable order matching
    /// `operands_mut`.
    pub fn operands(&self) -> Vec<Value> {
        self.operands_ref().into_iter().copied().collect()
    }

    fn operands_ref(&self) -> Vec<&Value> {
        match self {
            Opcode::Alloca { .. } => vec![],
            Opcode::Load { ptr, .. } => vec![ptr],
            Opcode::Store { value, ptr } => vec![value, ptr],
            Opcode::Gep { base, indices } => {
                let mut v = vec![base];
                v.extend(indices.iter());
                v
            }
            Opcode::Bitcast { value, .. } => vec![value],
            Opcode::Call { args, .. } => args.iter().collect(),
            Opcode::Phi { incomings, .. } => incomings.iter().map(|(v, _)| v).collect(),
            Opcode::Icmp { lhs, rhs, .. } => vec![lhs, rhs],
            Opcode::Select { cond, if_true, if_false, .. } => vec![cond, if_true, if_false],
            Opcode::Xor { lhs, rhs, .. } => vec![lhs, rhs],
            Opcode::Add { lhs, rhs, .. } => vec![lhs, rhs],
            Opcode::Br { .. } => vec![],
            Opcode::CondBr { cond, .. } => vec![cond],
            Opcode::Switch { cond, .. } => vec![cond],
            Opcode::Ret { value } => value.iter().collect(),
            Opcode::Unreachable | Opcode::UnsupportedTerminator { .. } => vec![],
        }
    }

    /// Mutable access to every operand slot, same order as `operands`.
    /// Used by `Use::set` to redirect exactly one operand.
    pub fn operands_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Opcode::Alloca { .. } => vec![],
            Opcode::Load { ptr, .. } => vec![ptr],
            Opcode::Store { value, ptr } => vec![value, ptr],
            Opcode::Gep { base, indices } => {
                let mut v = vec![base];
                v.extend(indices.iter_mut());
                v
            }
            Opcode::Bitcast { value, .. } => vec![value],
            Opcode::Call { args, .. } => args.iter_mut().collect(),
            Opcode::Phi { incomings, .. } => incomings.iter_mut().map(|(v, _)| v).collect(),
            Opcode::Icmp { lhs, rhs, .. } => vec![lhs, rhs],
            Opcode::Select { cond, if_true, if_false, .. } => vec![cond, if_true, if_false],
            Opcode::Xor { lhs, rhs, .. } => vec![lhs, rhs],
            Opcode::Add { lhs, rhs, .. } => vec![lhs, rhs],
            Opcode::Br { .. } => vec![],
            Opcode::CondBr { cond, .. } => vec![cond],
            Opcode::Switch { cond, .. } => vec![cond],
            Opcode::Ret { value } => value.iter_mut().collect(),
            Opcode::Unreachable | Opcode::UnsupportedTerminator { .. } => vec![],
        }
    }
}

/// An instruction plus the bookkeeping the arena needs: which block it
/// currently lives in (updated on insert/move, stale once erased).
#[derive(Clone, Debug)]
pub struct InstructionData {
    pub opcode: Opcode,
    pub block: Block,
}
