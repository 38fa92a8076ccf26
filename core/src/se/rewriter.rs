//! SE: UseRewriter (spec.md §4.3). For each eligible global, allocates a
//! per-use stack buffer, inserts a decrypt call, and redirects the use to
//! the buffer. Per-use buffers are required (not a shared scratch global)
//! because concurrent uses within a function, loops, or reentrancy must
//! each observe correct plaintext.

use chakravyuha_ir::{Builder, ConstantData, Cursor, FunctionId, GlobalId, GlobalVariable, Linkage, Module, Type, Value};

use crate::report::Report;
use crate::se::decrypt_stub;

/// Encrypts `gid`'s plaintext with `key`, creates the ciphertext global,
/// rewrites every instruction use it can, and erases the original only
/// if every use was rewritten. Returns `true` if the global was fully
/// processed (encrypted and erased).
pub fn rewrite_global(module: &mut Module, gid: GlobalId, stub: FunctionId, key: u8, report: &mut Report) -> bool {
    let plaintext = match module.global(gid).initializer {
        Some(cid) => module.constant(cid).as_bytes().to_vec(),
        None => return false,
    };
    // Length-preserving: the last byte (the NUL) is XORed in place rather
    // than dropped and a fresh NUL appended (spec.md §9 Open Question
    // "SE null handling", variant (b)).
    let ciphertext: Vec<u8> = plaintext.iter().map(|b| b ^ key).collect();

    let original_name = module.global(gid).name.clone();
    let enc_const = module.add_constant(ConstantData::Bytes(ciphertext.clone()));
    let enc_global = module.create_global(GlobalVariable {
        name: format!("{original_name}.enc"),
        is_constant: true,
        linkage: Linkage::Internal,
        initializer: Some(enc_const),
    });
    module.add_compiler_used(enc_global);

    let length_const = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: ciphertext.len() as i64 }));

    let mut all_rewritten = true;
    let function_ids: Vec<FunctionId> = module.functions().collect();
    for fid in function_ids {
        let uses = module.function(fid).uses_of_value(Value::Global(gid));
        for u in uses {
            let func = module.function_mut(fid);
            let mut b = Builder::new(func, Cursor::Before(u.user));
            let buffer = b.alloca(Type::I8, ciphertext.len() as u32);
            decrypt_stub::call_decrypt_stub(&mut b, stub, buffer, Value::Global(enc_global), length_const);
            func.set_use(u, buffer);
            log::debug!("rewrote a use of `{original_name}` in function `{}`", func.name);
        }
        // Every use this IR model can express is an instruction operand
        // (there is no constant-expression user distinct from that, the
        // sharp edge spec.md §9 warns about for hosts with a richer
        // constant-folding layer); if a use somehow survives the pass
        // above, the global is left unprocessed rather than erased.
        if !module.function(fid).uses_of_value(Value::Global(gid)).is_empty() {
            all_rewritten = false;
        }
    }

    if all_rewritten {
        module.erase_global(gid);
        report.record_string_encrypted(plaintext.len(), ciphertext.len());
        log::debug!("encrypted string global `{original_name}` ({} bytes)", plaintext.len());
        true
    } else {
        module.erase_global(enc_global);
        log::warn!("global `{original_name}` left unprocessed: not every use could be rewritten");
        false
    }
}
