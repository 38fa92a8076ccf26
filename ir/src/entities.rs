//! Small `Copy` entity ids backed by `cranelift_entity`, the same
//! entity-arena approach cranelift/wasmtime/midenc use for compiler IR.

use cranelift_entity::entity_impl;

/// A basic block within a single function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Block(u32);
entity_impl!(Block, "block");

/// An instruction within a single function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// A function within a module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct FunctionId(u32);
entity_impl!(FunctionId, "fn");

/// A global variable within a module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct GlobalId(u32);
entity_impl!(GlobalId, "global");

/// A module-level constant (the initializer content of a global, or an
/// inline constant operand).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ConstantId(u32);
entity_impl!(ConstantId, "const");
