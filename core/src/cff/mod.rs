//! Control-Flow Flattening (spec.md §4.4–4.6): replace a function's
//! structured CFG with a dispatcher-driven state machine.

pub mod demote;
pub mod flatten;
pub mod gate;

pub use gate::FlattenConfig;

use chakravyuha_ir::{FunctionId, Module, ReferenceVerifier, Verifier};

use crate::error::CoreError;
use crate::report::Report;
use crate::rng::EntropySource;

/// Runs CFF over every function in the module: gate, demote, flatten,
/// verify, and roll back on failure (spec.md §4.6.2, §7). Ineligible
/// functions are logged and counted, never treated as an error.
pub fn run(
    module: &mut Module,
    config: &FlattenConfig,
    entropy: &mut dyn EntropySource,
    verifier: &dyn Verifier,
    report: &mut Report,
) {
    let function_ids: Vec<FunctionId> = module.functions().collect();
    for fid in function_ids {
        run_one(module, fid, config, entropy, verifier, report);
    }
}

fn run_one(
    module: &mut Module,
    fid: FunctionId,
    config: &FlattenConfig,
    entropy: &mut dyn EntropySource,
    verifier: &dyn Verifier,
    report: &mut Report,
) {
    let name = module.function(fid).name.clone();

    if let Err(reason) = gate::is_eligible(module.function(fid), config) {
        log::info!("function `{name}` skipped by CFF: {reason}");
        report.record_function_skipped(&name, reason);
        return;
    }

    let pristine = module.function(fid).clone();

    demote::demote(module.function_mut(fid));

    let flatten_result = {
        // Split the borrow: `flatten::flatten` needs `&mut Module` (to add
        // constants) and `&mut Function` simultaneously, which isn't
        // possible through `module.function_mut` alone since that borrows
        // all of `module`. Take the function out, flatten it against the
        // module, then put it back.
        let placeholder = chakravyuha_ir::Function::declaration(name.clone(), vec![], None);
        let mut func = std::mem::replace(module.function_mut(fid), placeholder);
        let result = flatten::flatten(module, &mut func, config, entropy);
        *module.function_mut(fid) = func;
        result
    };

    if let Err(CoreError::InvariantViolation { reason, .. }) = &flatten_result {
        log::warn!("function `{name}` flattening aborted, restoring original: {reason}");
        *module.function_mut(fid) = pristine;
        report.record_function_skipped(&name, format!("internal invariant violation: {reason}"));
        return;
    }

    match verifier.verify_function(module, module.function(fid)) {
        Ok(()) => {
            let block_count = module.function(fid).block_count();
            log::debug!("function `{name}` flattened ({block_count} blocks)");
            report.record_function_flattened(block_count);
        }
        Err(e) => {
            log::warn!("function `{name}` failed verification after flattening, rolling back: {e}");
            *module.function_mut(fid) = pristine;
            report.record_function_skipped(&name, format!("verification failed: {e}"));
        }
    }
}
