//! Abstract view of the mid-level IR the `chakravyuha-core` obfuscation
//! passes manipulate: modules, functions, basic blocks, terminators,
//! instructions, values, global variables, constants, a builder, and a
//! verifier. The core depends on nothing else here; a real embedding
//! host (an LLVM-style pass manager) would implement this surface
//! against its own in-memory IR instead of using these concrete types.

pub mod block;
pub mod builder;
pub mod entities;
pub mod error;
pub mod eval;
pub mod function;
pub mod global;
pub mod instruction;
pub mod module;
pub mod types;
pub mod value;
pub mod verify;

pub use block::BasicBlockData;
pub use builder::{Builder, Cursor};
pub use entities::{Block, ConstantId, FunctionId, GlobalId, Inst};
pub use error::IrError;
pub use function::{FlattenInfo, Function};
pub use global::{ConstantData, GlobalVariable, Linkage};
pub use instruction::{Callee, IcmpPred, InstructionData, Opcode};
pub use module::Module;
pub use types::Type;
pub use value::{Use, Value};
pub use verify::{ReferenceVerifier, Verifier};
