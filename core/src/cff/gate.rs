//! CFF: FunctionGate (spec.md §4.4). Decides whether a function is
//! eligible for flattening; the decision is cheap so the driver can
//! re-check it for every function without caching.

use chakravyuha_ir::{Function, Opcode};

/// Knobs spec.md §5/§9 call for: the minimum block count (spec.md's
/// "block count above threshold") and an optional fixed seed for the
/// dense-id shuffle and, when string encryption runs in the same pass,
/// the SE key too.
#[derive(Clone, Debug)]
pub struct FlattenConfig {
    pub min_block_count: usize,
    pub seed: Option<u64>,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        FlattenConfig { min_block_count: 2, seed: None }
    }
}

/// Returns `Ok(())` if `func` may be flattened, or `Err(reason)` — a
/// one-line, loggable explanation — otherwise.
pub fn is_eligible(func: &Function, config: &FlattenConfig) -> Result<(), String> {
    if func.is_declaration {
        return Err("function is a declaration".to_owned());
    }
    if func.is_intrinsic {
        return Err("function is an intrinsic".to_owned());
    }
    if func.block_count() < config.min_block_count {
        return Err(format!("block count {} is below the threshold of {}", func.block_count(), config.min_block_count));
    }

    for block in func.blocks() {
        if func.block(block).is_pad {
            return Err(format!("block {block:?} is an exception-handling pad"));
        }
        let Some(term) = func.terminator(block) else {
            return Err(format!("block {block:?} has no terminator"));
        };
        match func.opcode(term) {
            Opcode::Br { .. } | Opcode::CondBr { .. } | Opcode::Switch { .. } | Opcode::Ret { .. } | Opcode::Unreachable => {}
            Opcode::UnsupportedTerminator { mnemonic } => {
                return Err(format!("block {block:?} has an unsupported terminator `{mnemonic}`"));
            }
            other => return Err(format!("block {block:?} ends in a non-terminator instruction {other:?}")),
        }
    }

    Ok(())
}
