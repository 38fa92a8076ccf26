//! CFF: Flattener (spec.md §4.6). Assigns a dense state id to every
//! non-entry block, installs a dispatcher, builds a next-state
//! expression at every rewritten terminator, and rewires the CFG so
//! every transition flows through the dispatcher.

use std::collections::{HashMap, HashSet};

use chakravyuha_ir::{
    Block, Builder, ConstantData, Cursor, FlattenInfo, Function, IcmpPred, Module, Opcode, Type, Value,
};

use crate::error::CoreError;
use crate::rng::EntropySource;

use super::gate::FlattenConfig;

enum NextState {
    /// A value (built at the builder's cursor) that computes the next
    /// dispatcher state.
    Value(Value),
    /// The terminator's next state cannot be computed under spec.md
    /// §4.6.1's rule; leave it exactly as it was.
    PreserveOriginal,
}

fn const_i64(module: &mut Module, value: i64) -> Value {
    Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value }))
}

/// Spec.md §4.6.1: the next-state construction rule, one arm per
/// terminator kind. Emits whatever instructions it needs (selects) at
/// `b`'s cursor, which callers anchor immediately before the terminator
/// being replaced.
fn compute_next_state(module: &mut Module, b: &mut Builder<'_>, term: &Opcode, ids: &HashMap<Block, i64>) -> NextState {
    match term {
        Opcode::Br { target } => match ids.get(target) {
            Some(&id) => NextState::Value(const_i64(module, id)),
            None => NextState::PreserveOriginal,
        },
        Opcode::CondBr { cond, then_block, else_block } => match (ids.get(then_block), ids.get(else_block)) {
            (Some(&t), Some(&f)) => {
                let tv = const_i64(module, t);
                let fv = const_i64(module, f);
                NextState::Value(b.select(Type::I32, *cond, tv, fv))
            }
            // Do not attempt asymmetric flattening (spec.md §9): half
            // flattening would leave the non-flattened successor with
            // two predecessors (the dispatcher and this block) that the
            // demoter never anticipated.
            _ => NextState::PreserveOriginal,
        },
        Opcode::Switch { cond, default, cases } => {
            let any_flattened = ids.contains_key(default) || cases.iter().any(|(_, s)| ids.contains_key(s));
            if !any_flattened {
                return NextState::PreserveOriginal;
            }
            let mut acc = match ids.get(default) {
                Some(&id) => const_i64(module, id),
                None => const_i64(module, 0),
            };
            // Iteration order of `cases` is the switch's declaration
            // order, preserved from the original terminator — required
            // for deterministic output (spec.md §4.6.1 tie-break).
            for (value, succ) in cases {
                if let Some(&id) = ids.get(succ) {
                    let case_const = const_i64(module, *value);
                    let matches = b.icmp(IcmpPred::Eq, *cond, case_const);
                    let id_const = const_i64(module, id);
                    acc = b.select(Type::I32, matches, id_const, acc);
                }
            }
            NextState::Value(acc)
        }
        // Never rewritten; these terminate the state machine.
        Opcode::Ret { .. } | Opcode::Unreachable => NextState::PreserveOriginal,
        Opcode::UnsupportedTerminator { .. } => NextState::PreserveOriginal,
        _ => NextState::PreserveOriginal,
    }
}

fn reachable_blocks(func: &Function, entry: Block) -> HashSet<Block> {
    let mut seen = HashSet::new();
    let mut stack = vec![entry];
    while let Some(b) = stack.pop() {
        if seen.insert(b) {
            stack.extend(func.successors(b));
        }
    }
    seen
}

/// Flattens `func` in place. `func` must already be gated eligible and
/// demoted. On success `func.flatten_info` is populated; on error the
/// caller (the driver) is responsible for restoring the pre-flatten
/// clone — this function does not attempt to undo its own partial work.
pub fn flatten(
    module: &mut Module,
    func: &mut Function,
    _config: &FlattenConfig,
    entropy: &mut dyn EntropySource,
) -> Result<(), CoreError> {
    let entry = func.entry();
    let targets: Vec<Block> = func.blocks().filter(|&b| b != entry).collect();
    if targets.is_empty() {
        return Ok(());
    }

    let mut ids: Vec<u32> = (1..=targets.len() as u32).collect();
    entropy.shuffle_ids(&mut ids);
    let block_ids: HashMap<Block, i64> = targets.iter().copied().zip(ids.into_iter().map(i64::from)).collect();

    let state_slot = func.insert_at_block_start(entry, Opcode::Alloca { ty: Type::I32, count: 1 });
    let state_ptr = Value::Inst(state_slot);

    let dispatch = func.create_block();
    let default = func.create_block();
    Builder::new(func, Cursor::AtBlockEnd(default)).unreachable();

    // Step 5: initial state, from the entry's original terminator.
    let entry_term = func.terminator(entry).expect("entry always has a terminator");
    let entry_op = func.opcode(entry_term).clone();
    let next = {
        let mut b = Builder::new(func, Cursor::Before(entry_term));
        compute_next_state(module, &mut b, &entry_op, &block_ids)
    };
    let next_value = match next {
        NextState::Value(v) => v,
        NextState::PreserveOriginal => {
            return Err(CoreError::InvariantViolation {
                function: func.name.clone(),
                reason: "entry terminator's next state could not be computed".into(),
            });
        }
    };
    {
        let mut b = Builder::new(func, Cursor::Before(entry_term));
        b.store(next_value, state_ptr);
        b.br(dispatch);
    }
    func.erase_inst(entry_term);

    // Step 6: dispatcher.
    {
        let mut b = Builder::new(func, Cursor::AtBlockEnd(dispatch));
        let loaded = b.load(Type::I32, state_ptr);
        let cases: Vec<(i64, Block)> = targets.iter().map(|&blk| (block_ids[&blk], blk)).collect();
        b.switch(loaded, default, cases);
    }

    // Step 7: per-block rewrite.
    for &block in &targets {
        let term = func.terminator(block).expect("block has a terminator");
        let op = func.opcode(term).clone();
        if matches!(op, Opcode::Ret { .. } | Opcode::Unreachable) {
            continue;
        }
        let next = {
            let mut b = Builder::new(func, Cursor::Before(term));
            compute_next_state(module, &mut b, &op, &block_ids)
        };
        if let NextState::Value(v) = next {
            let mut b = Builder::new(func, Cursor::Before(term));
            b.store(v, state_ptr);
            b.br(dispatch);
            func.erase_inst(term);
        }
    }

    // Step 8: blocks unreachable after rewiring are dropped.
    let reachable = reachable_blocks(func, entry);
    let dead: Vec<Block> = func.blocks().filter(|b| !reachable.contains(b)).collect();
    for b in dead {
        func.erase_block(b);
    }

    func.flatten_info = Some(FlattenInfo { dispatch, default, state_slot });
    Ok(())
}
