//! A tiny reference interpreter over the instruction subset the core
//! passes emit or understand (arithmetic, icmp/select, the conservative
//! terminator set, and calls). Not part of the obfuscator: added so
//! tests can assert "observable equivalence" (spec.md §8) against a real
//! execution instead of structural inspection alone. A real embedding
//! host would never use this; it compiles the IR to machine code.

use std::collections::HashMap;

use crate::function::Function;
use crate::instruction::Callee;
use crate::value::Value;
use crate::{ConstantData, FunctionId, GlobalId, IcmpPred, Inst, Module, Opcode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RtValue {
    Int(i64),
    Ptr(usize),
}

impl RtValue {
    fn as_i64(self) -> i64 {
        match self {
            RtValue::Int(v) => v,
            RtValue::Ptr(p) => p as i64,
        }
    }

    fn as_usize(self) -> usize {
        match self {
            RtValue::Ptr(p) => p,
            RtValue::Int(v) => v as usize,
        }
    }
}

/// Byte-addressable scratch memory plus a captured-output buffer that
/// stands in for whatever `print`-like routine the real host runtime
/// would provide.
pub struct Interp<'m> {
    module: &'m Module,
    mem: Vec<u8>,
    pub output: String,
    global_addrs: HashMap<GlobalId, usize>,
}

impl<'m> Interp<'m> {
    pub fn new(module: &'m Module) -> Self {
        let mut interp = Interp {
            module,
            mem: Vec::new(),
            output: String::new(),
            global_addrs: HashMap::new(),
        };
        interp.layout_globals();
        interp
    }

    fn bump(&mut self, len: usize) -> usize {
        let addr = self.mem.len();
        self.mem.resize(addr + len.max(1), 0);
        addr
    }

    fn layout_globals(&mut self) {
        for gid in self.module.globals() {
            let g = self.module.global(gid);
            let bytes = g
                .initializer
                .map(|c| self.module.constant(c).as_bytes().to_vec())
                .unwrap_or_default();
            let addr = self.bump(bytes.len());
            self.mem[addr..addr + bytes.len()].copy_from_slice(&bytes);
            self.global_addrs.insert(gid, addr);
        }
    }

    pub fn call_function(&mut self, fid: FunctionId, args: &[RtValue]) -> Option<RtValue> {
        let module = self.module;
        let func = module.function(fid);
        let mut locals: HashMap<Inst, RtValue> = HashMap::new();
        let mut block = func.entry();

        loop {
            let mut advanced = false;
            for &inst in &func.block(block).insts {
                let op = func.opcode(inst).clone();
                match op {
                    Opcode::Alloca { ty, count } => {
                        let addr = self.bump(ty.byte_size() as usize * (count.max(1) as usize));
                        locals.insert(inst, RtValue::Ptr(addr));
                    }
                    Opcode::Load { ptr, .. } => {
                        let addr = self.eval(&locals, args, ptr).as_usize();
                        locals.insert(inst, RtValue::Int(self.mem[addr] as i64));
                    }
                    Opcode::Store { value, ptr } => {
                        let addr = self.eval(&locals, args, ptr).as_usize();
                        let v = self.eval(&locals, args, value).as_i64();
                        self.mem[addr] = v as u8;
                    }
                    Opcode::Gep { base, indices } => {
                        let mut addr = self.eval(&locals, args, base).as_usize() as i64;
                        for idx in &indices {
                            addr += self.eval(&locals, args, *idx).as_i64();
                        }
                        locals.insert(inst, RtValue::Ptr(addr as usize));
                    }
                    Opcode::Bitcast { value, .. } => {
                        let v = self.eval(&locals, args, value);
                        locals.insert(inst, v);
                    }
                    Opcode::Call { callee, args: call_args, .. } => {
                        let arg_vals: Vec<RtValue> =
                            call_args.iter().map(|v| self.eval(&locals, args, *v)).collect();
                        if let Some(r) = self.do_call(&callee, &arg_vals) {
                            locals.insert(inst, r);
                        }
                    }
                    Opcode::Icmp { pred, lhs, rhs } => {
                        let l = self.eval(&locals, args, lhs).as_i64();
                        let r = self.eval(&locals, args, rhs).as_i64();
                        let result = match pred {
                            IcmpPred::Eq => l == r,
                            IcmpPred::Ne => l != r,
                            IcmpPred::Slt => l < r,
                            IcmpPred::Sgt => l > r,
                            IcmpPred::Sle => l <= r,
                            IcmpPred::Sge => l >= r,
                        };
                        locals.insert(inst, RtValue::Int(result as i64));
                    }
                    Opcode::Select { cond, if_true, if_false, .. } => {
                        let c = self.eval(&locals, args, cond).as_i64();
                        let v = if c != 0 {
                            self.eval(&locals, args, if_true)
                        } else {
                            self.eval(&locals, args, if_false)
                        };
                        locals.insert(inst, v);
                    }
                    Opcode::Xor { lhs, rhs, .. } => {
                        let l = self.eval(&locals, args, lhs).as_i64();
                        let r = self.eval(&locals, args, rhs).as_i64();
                        locals.insert(inst, RtValue::Int(l ^ r));
                    }
                    Opcode::Add { lhs, rhs, .. } => {
                        let l = self.eval(&locals, args, lhs).as_i64();
                        let r = self.eval(&locals, args, rhs).as_i64();
                        locals.insert(inst, RtValue::Int(l + r));
                    }
                    Opcode::Phi { .. } => {
                        panic!("interpreter does not support phi nodes; demote before evaluating")
                    }
                    Opcode::Br { target } => {
                        block = target;
                        advanced = true;
                        break;
                    }
                    Opcode::CondBr { cond, then_block, else_block } => {
                        let c = self.eval(&locals, args, cond).as_i64();
                        block = if c != 0 { then_block } else { else_block };
                        advanced = true;
                        break;
                    }
                    Opcode::Switch { cond, default, cases } => {
                        let c = self.eval(&locals, args, cond).as_i64();
                        block = cases.iter().find(|(v, _)| *v == c).map(|(_, b)| *b).unwrap_or(default);
                        advanced = true;
                        break;
                    }
                    Opcode::Ret { value } => {
                        return value.map(|v| self.eval(&locals, args, v));
                    }
                    Opcode::Unreachable => panic!("reached an unreachable instruction"),
                    Opcode::UnsupportedTerminator { mnemonic } => {
                        panic!("unsupported terminator reached at runtime: {mnemonic}")
                    }
                }
            }
            if !advanced {
                panic!("block {block:?} fell off its instruction list without a terminator");
            }
        }
    }

    fn do_call(&mut self, callee: &Callee, args: &[RtValue]) -> Option<RtValue> {
        match callee {
            Callee::Function(fid) => self.call_function(*fid, args),
            Callee::Extern(name) => match name.as_str() {
                "print_str" => {
                    let ptr = args[0].as_usize();
                    let len = args[1].as_i64() as usize;
                    let bytes = &self.mem[ptr..ptr + len];
                    self.output.push_str(&String::from_utf8_lossy(bytes));
                    None
                }
                "print_i32" => {
                    self.output.push_str(&args[0].as_i64().to_string());
                    None
                }
                other => panic!("unknown extern intrinsic `{other}`"),
            },
        }
    }

    fn eval(&self, locals: &HashMap<Inst, RtValue>, args: &[RtValue], v: Value) -> RtValue {
        match v {
            Value::Inst(i) => *locals.get(&i).expect("use of instruction before its value was computed"),
            Value::Param(p) => args[p as usize],
            Value::Const(c) => match self.module.constant(c) {
                ConstantData::Int { value, .. } => RtValue::Int(*value),
                ConstantData::CString { .. } | ConstantData::Bytes(_) => {
                    panic!("byte-array constant used as a scalar operand")
                }
            },
            Value::Global(g) => RtValue::Ptr(self.global_addrs[&g]),
            Value::Undef => RtValue::Int(0),
        }
    }
}

#[allow(unused)]
fn _assert_function_type(_f: &Function) {}
