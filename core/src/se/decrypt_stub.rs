//! Synthesizes the per-module decrypt routine spec.md §4.2 describes:
//! `void D(dest: *u8, src: *u8, length: i32)`, internal linkage, a
//! three-block loop body. Idempotent — a second call on the same module
//! finds and reuses the existing stub rather than emitting another one.

use chakravyuha_ir::{Builder, Callee, ConstantData, Cursor, Function, FunctionId, IcmpPred, Linkage, Module, Opcode, Type, Value};

use crate::rng::EntropySource;

pub const DECRYPT_STUB_NAME: &str = "__chakravyuha_decrypt";

/// Returns the module's decrypt stub, creating it on the first call and
/// reusing it on every later one. `key_override` pins the key (for
/// reproducible tests); otherwise a fresh key comes from `entropy`.
pub fn ensure_decrypt_stub(
    module: &mut Module,
    entropy: &mut dyn EntropySource,
    key_override: Option<u8>,
) -> (FunctionId, u8) {
    if let Some(existing) = module.find_function(DECRYPT_STUB_NAME) {
        let key = extract_key(module, existing);
        return (existing, key);
    }
    let key = key_override.unwrap_or_else(|| entropy.key_byte());
    let fid = build_decrypt_stub(module, key);
    (fid, key)
}

fn extract_key(module: &Module, fid: FunctionId) -> u8 {
    let func = module.function(fid);
    for block in func.blocks() {
        for &inst in &func.block(block).insts {
            if let Opcode::Xor { rhs: Value::Const(c), .. } = func.opcode(inst) {
                if let ConstantData::Int { value, .. } = module.constant(*c) {
                    return *value as u8;
                }
            }
        }
    }
    panic!("decrypt stub `{DECRYPT_STUB_NAME}` exists without a key constant")
}

fn build_decrypt_stub(module: &mut Module, key: u8) -> FunctionId {
    let mut func = Function::new(DECRYPT_STUB_NAME, vec![Type::Ptr, Type::Ptr, Type::I32], None);
    func.linkage = Linkage::Internal;
    // Synthesized by the core, never by the host's own frontend; marking
    // it an intrinsic keeps FunctionGate from trying to flatten a loop
    // that already has the shape flattening would otherwise produce.
    func.is_intrinsic = true;

    let entry = func.entry();
    let header = func.create_block();
    let body = func.create_block();
    let exit = func.create_block();

    let src = Value::Param(1);
    let dest = Value::Param(0);
    let length = Value::Param(2);

    let zero = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: 0 }));
    let one = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: 1 }));
    let key_const = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I8, value: key as i64 }));

    // The induction variable lives in a stack slot from the start rather
    // than as a ϕ-node: this function is excluded from CFF (marked
    // `is_intrinsic`), so nothing ever demotes it, and the verifier's
    // cross-block-use check applies to it like any other function.
    let i_slot = {
        let mut b = Builder::new(&mut func, Cursor::AtBlockEnd(entry));
        let slot = b.alloca(Type::I32, 1);
        b.store(zero, slot);
        b.br(header);
        slot
    };

    let cond = {
        let mut b = Builder::new(&mut func, Cursor::AtBlockEnd(header));
        let i = b.load(Type::I32, i_slot);
        b.icmp(IcmpPred::Slt, i, length)
    };
    Builder::new(&mut func, Cursor::AtBlockEnd(header)).cond_br(cond, body, exit);

    {
        let mut b = Builder::new(&mut func, Cursor::AtBlockEnd(body));
        let i = b.load(Type::I32, i_slot);
        let src_ptr = b.gep(src, vec![i]);
        let byte = b.load(Type::I8, src_ptr);
        let enc = b.xor(Type::I8, byte, key_const);
        let dest_ptr = b.gep(dest, vec![i]);
        b.store(enc, dest_ptr);
        let i_next = b.add(Type::I32, i, one);
        b.store(i_next, i_slot);
        b.br(header);
    }

    Builder::new(&mut func, Cursor::AtBlockEnd(exit)).ret(None);

    module.create_function(func)
}

/// Builds a call to the decrypt stub: `D(dest, src, length)`.
pub fn call_decrypt_stub(b: &mut Builder<'_>, stub: FunctionId, dest: Value, src: Value, length: Value) {
    b.call(Callee::Function(stub), vec![dest, src, length], None);
}
