//! CFF: Demoter (spec.md §4.5, §9 "Phi removal without dominance loss").
//! Makes every value that lives across a block boundary reachable
//! through a dedicated stack slot, so the flattener's CFG rewrite can't
//! break dominance.

use chakravyuha_ir::{Block, Function, Inst, Opcode, Value};

pub fn demote(func: &mut Function) {
    demote_phis(func);
    demote_cross_block_values(func);
}

/// Step 1 (spec.md §4.5): every phi becomes a stack slot, a poison store
/// at the end of the entry (needed once the dispatcher can reach a block
/// from something other than its original predecessors), a store at each
/// incoming predecessor's terminator, and a load at each use site.
fn demote_phis(func: &mut Function) {
    let entry = func.entry();

    let mut phis: Vec<Inst> = Vec::new();
    for block in func.blocks() {
        phis.extend(func.phis_in(block));
    }

    for phi_inst in phis {
        let (ty, incomings) = match func.opcode(phi_inst).clone() {
            Opcode::Phi { ty, incomings } => (ty, incomings),
            _ => continue,
        };

        let slot = func.insert_at_block_start(entry, Opcode::Alloca { ty, count: 1 });
        let slot_val = Value::Inst(slot);

        let entry_term = func.terminator(entry).expect("entry always has a terminator");
        func.insert_before(entry_term, Opcode::Store { value: Value::Undef, ptr: slot_val });

        for (value, pred) in &incomings {
            let pred_term = func.terminator(*pred).expect("predecessor always has a terminator");
            func.insert_before(pred_term, Opcode::Store { value: *value, ptr: slot_val });
        }

        for u in func.uses_of_value(Value::Inst(phi_inst)) {
            let load = func.insert_before(u.user, Opcode::Load { ty, ptr: slot_val });
            func.set_use(u, Value::Inst(load));
        }

        func.erase_inst(phi_inst);
    }
}

/// Step 2 (spec.md §4.5): every non-phi, non-alloca, non-terminator
/// instruction with at least one user outside its own block gets a slot,
/// a store immediately after its definition, and a load immediately
/// before each external use. Intra-block uses are left alone — they
/// still dominate their uses, so leaving them in SSA form is correct.
fn demote_cross_block_values(func: &mut Function) {
    let entry = func.entry();

    let mut candidates: Vec<(Block, Inst)> = Vec::new();
    for block in func.blocks() {
        for inst in func.body_insts(block) {
            let op = func.opcode(inst);
            if op.is_alloca() {
                continue;
            }
            if op.result_type().is_none() {
                continue;
            }
            candidates.push((block, inst));
        }
    }

    for (def_block, inst) in candidates {
        let external_uses: Vec<_> =
            func.uses_of_value(Value::Inst(inst)).into_iter().filter(|u| func.parent_block(u.user) != def_block).collect();
        if external_uses.is_empty() {
            continue;
        }

        let ty = func.opcode(inst).result_type().expect("filtered to value-producing instructions");
        let slot = func.insert_at_block_start(entry, Opcode::Alloca { ty, count: 1 });
        let slot_val = Value::Inst(slot);

        func.insert_before(next_inst_after(func, inst), Opcode::Store { value: Value::Inst(inst), ptr: slot_val });

        for u in external_uses {
            let load = func.insert_before(u.user, Opcode::Load { ty, ptr: slot_val });
            func.set_use(u, Value::Inst(load));
        }
    }
}

/// The instruction immediately following `inst` in its own block. Exists
/// because `insert_before` needs a successor instruction, and `inst`'s
/// block is guaranteed non-empty past `inst` (every block ends in a
/// terminator, and `inst` here is never itself one).
fn next_inst_after(func: &Function, inst: Inst) -> Inst {
    let block = func.parent_block(inst);
    let insts = &func.block(block).insts;
    let pos = insts.iter().position(|&i| i == inst).expect("inst lives in its recorded block");
    insts[pos + 1]
}
