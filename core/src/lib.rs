//! Control-flow flattening and string-encryption obfuscation passes for
//! a mid-level IR (`chakravyuha-ir`). This crate is the engine an
//! embedding host links against; `chakravyuha-cli` is a standalone
//! harness for driving it without a real host optimizer attached.

pub mod cff;
pub mod driver;
pub mod error;
pub mod fakecode;
pub mod pass;
pub mod report;
pub mod rng;
pub mod se;

pub use driver::{Driver, DriverConfig};
pub use error::CoreError;
pub use report::Report;

#[cfg(test)]
mod tests {
    use chakravyuha_ir::{
        Builder, ConstantData, Cursor, Function, GlobalVariable, IcmpPred, Linkage, Module, Opcode, ReferenceVerifier,
        Type, Value, Verifier,
    };

    use crate::driver::{Driver, DriverConfig};
    use crate::se::StringEncryptConfig;

    fn rt_as_i64(v: chakravyuha_ir::eval::RtValue) -> i64 {
        match v {
            chakravyuha_ir::eval::RtValue::Int(n) => n,
            chakravyuha_ir::eval::RtValue::Ptr(p) => p as i64,
        }
    }

    fn empty_main() -> Module {
        let mut module = Module::new("empty");
        let mut f = Function::new("main", vec![], Some(Type::I32));
        let entry = f.entry();
        let zero = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: 0 }));
        Builder::new(&mut f, Cursor::AtBlockEnd(entry)).ret(Some(zero));
        module.create_function(f);
        module
    }

    #[test]
    fn empty_string_table_leaves_module_verifiable() {
        let mut module = empty_main();
        let driver = Driver::new(DriverConfig { seed: Some(1), ..Default::default() });
        let report = driver.run(&mut module);
        assert_eq!(report.strings_encrypted, 0);
        assert!(ReferenceVerifier.verify_module(&module).is_ok());
    }

    #[test]
    fn hello_world_string_is_encrypted_and_decrypt_call_inserted() {
        let mut module = Module::new("hello");
        let plaintext = b"hello\n\0".to_vec();
        let cid = module.add_constant(ConstantData::CString { bytes: plaintext.clone(), nul_terminated: true });
        let gid = module.create_global(GlobalVariable {
            name: ".str.hello".to_owned(),
            is_constant: true,
            linkage: Linkage::Private,
            initializer: Some(cid),
        });

        let mut f = Function::new("main", vec![], Some(Type::I32));
        let entry = f.entry();
        let len_const = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: plaintext.len() as i64 }));
        {
            let mut b = Builder::new(&mut f, Cursor::AtBlockEnd(entry));
            b.call(
                chakravyuha_ir::Callee::Extern("print_str".to_owned()),
                vec![Value::Global(gid), len_const],
                None,
            );
            let zero = len_const;
            b.ret(Some(zero));
        }
        module.create_function(f);

        let driver = Driver::new(DriverConfig { seed: Some(42), ..Default::default() });
        let report = driver.run(&mut module);

        assert_eq!(report.strings_encrypted, 1);
        assert!(module.find_function("main").is_some());
        assert!(module.globals().all(|g| module.global(g).name != ".str.hello"));
        assert!(ReferenceVerifier.verify_module(&module).is_ok());
    }

    #[test]
    fn se_is_idempotent() {
        let mut module = Module::new("idempotent");
        let plaintext = b"x\0".to_vec();
        let cid = module.add_constant(ConstantData::CString { bytes: plaintext, nul_terminated: true });
        let gid = module.create_global(GlobalVariable {
            name: ".str.x".to_owned(),
            is_constant: true,
            linkage: Linkage::Private,
            initializer: Some(cid),
        });
        let mut f = Function::new("main", vec![], None);
        let entry = f.entry();
        {
            let mut b = Builder::new(&mut f, Cursor::AtBlockEnd(entry));
            b.call(chakravyuha_ir::Callee::Extern("print_str".to_owned()), vec![Value::Global(gid)], None);
            b.ret(None);
        }
        module.create_function(f);

        let config = StringEncryptConfig { key_override: Some(7), ..Default::default() };
        let mut entropy = crate::rng::SeededEntropy::new(1);
        let first = crate::se::run(&mut module, &config, &mut entropy);
        let globals_after_first: Vec<String> = module.globals().map(|g| module.global(g).name.clone()).collect();
        let second = crate::se::run(&mut module, &config, &mut entropy);
        let globals_after_second: Vec<String> = module.globals().map(|g| module.global(g).name.clone()).collect();

        assert_eq!(first.strings_encrypted, 1);
        assert_eq!(second.strings_encrypted, 0);
        assert_eq!(globals_after_first, globals_after_second);
    }

    #[test]
    fn branch_on_input_flattens_and_preserves_returns() {
        let mut module = Module::new("branch");
        let mut f = Function::new("classify", vec![Type::I32], Some(Type::I32));
        let entry = f.entry();
        let then_block = f.create_block();
        let else_block = f.create_block();

        let zero = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: 0 }));
        let one = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: 1 }));
        let neg_one = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: -1 }));

        {
            let mut b = Builder::new(&mut f, Cursor::AtBlockEnd(entry));
            let cond = b.icmp(IcmpPred::Sgt, Value::Param(0), zero);
            b.cond_br(cond, then_block, else_block);
        }
        Builder::new(&mut f, Cursor::AtBlockEnd(then_block)).ret(Some(one));
        Builder::new(&mut f, Cursor::AtBlockEnd(else_block)).ret(Some(neg_one));
        module.create_function(f);

        let driver = Driver::new(DriverConfig { seed: Some(7), ..Default::default() });
        let report = driver.run(&mut module);

        assert_eq!(report.functions_flattened, 1);
        let func = module.function(module.find_function("classify").unwrap());
        assert!(func.flatten_info.is_some());
        assert!(ReferenceVerifier.verify_module(&module).is_ok());

        for block in func.blocks() {
            if let Opcode::Ret { value } = func.opcode(func.terminator(block).unwrap()) {
                assert!(matches!(value, Some(Value::Const(_))));
            }
        }
    }

    #[test]
    fn switch_with_four_cases_flattens_and_preserves_dispatch() {
        use chakravyuha_ir::eval::{Interp, RtValue};

        let mut module = Module::new("switcher");
        let mut f = Function::new("pick", vec![Type::I32], Some(Type::I32));
        let entry = f.entry();
        let case0 = f.create_block();
        let case1 = f.create_block();
        let case2 = f.create_block();
        let case3 = f.create_block();
        let default = f.create_block();

        let consts: Vec<Value> = (0..4)
            .map(|n| Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: n * 10 })))
            .collect();
        let minus_one = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: -1 }));

        Builder::new(&mut f, Cursor::AtBlockEnd(entry)).switch(
            Value::Param(0),
            default,
            vec![(0, case0), (1, case1), (2, case2), (3, case3)],
        );
        for (block, v) in [(case0, consts[0]), (case1, consts[1]), (case2, consts[2]), (case3, consts[3])] {
            Builder::new(&mut f, Cursor::AtBlockEnd(block)).ret(Some(v));
        }
        Builder::new(&mut f, Cursor::AtBlockEnd(default)).ret(Some(minus_one));
        let fid = module.create_function(f);

        // Capture pre-flatten behavior across every case before mutating the module.
        let expected: Vec<i64> =
            (0..5).map(|n| rt_as_i64(Interp::new(&module).call_function(fid, &[RtValue::Int(n)]).unwrap())).collect();

        let driver = Driver::new(DriverConfig { cff: crate::cff::FlattenConfig { min_block_count: 2, seed: Some(9) }, seed: Some(9), ..Default::default() });
        let report = driver.run(&mut module);
        assert_eq!(report.functions_flattened, 1);
        assert!(ReferenceVerifier.verify_module(&module).is_ok());

        for (n, expect) in expected.into_iter().enumerate() {
            let got = rt_as_i64(Interp::new(&module).call_function(fid, &[RtValue::Int(n as i64)]).unwrap());
            assert_eq!(got, expect, "case {n} diverged after flattening");
        }
    }

    #[test]
    fn loop_with_induction_variable_demotes_phi_and_sums_to_expected_total() {
        use chakravyuha_ir::eval::{Interp, RtValue};

        // int sum = 0, i = 0; while (i < n) { sum += i; i += 1; } return sum;
        let mut module = Module::new("looper");
        let mut f = Function::new("sum_below", vec![Type::I32], Some(Type::I32));
        let entry = f.entry();
        let header = f.create_block();
        let body = f.create_block();
        let exit = f.create_block();

        let zero = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: 0 }));
        let one = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: 1 }));

        Builder::new(&mut f, Cursor::AtBlockEnd(entry)).br(header);

        let sum_phi = Builder::new(&mut f, Cursor::AtBlockStart(header)).phi(Type::I32, vec![(zero, entry)]);
        let i_phi = Builder::new(&mut f, Cursor::AtBlockStart(header)).phi(Type::I32, vec![(zero, entry)]);
        {
            let mut b = Builder::new(&mut f, Cursor::AtBlockEnd(header));
            let cond = b.icmp(IcmpPred::Slt, i_phi, Value::Param(0));
            b.cond_br(cond, body, exit);
        }
        let (next_sum, next_i) = {
            let mut b = Builder::new(&mut f, Cursor::AtBlockEnd(body));
            let next_sum = b.add(Type::I32, sum_phi, i_phi);
            let next_i = b.add(Type::I32, i_phi, one);
            b.br(header);
            (next_sum, next_i)
        };
        let sum_phi_inst = match sum_phi {
            Value::Inst(i) => i,
            _ => unreachable!(),
        };
        let i_phi_inst = match i_phi {
            Value::Inst(i) => i,
            _ => unreachable!(),
        };
        if let Opcode::Phi { incomings, .. } = &mut f.inst_mut(sum_phi_inst).opcode {
            incomings.push((next_sum, body));
        }
        if let Opcode::Phi { incomings, .. } = &mut f.inst_mut(i_phi_inst).opcode {
            incomings.push((next_i, body));
        }
        Builder::new(&mut f, Cursor::AtBlockEnd(exit)).ret(Some(sum_phi));
        let fid = module.create_function(f);

        let n = 10;
        let expected = rt_as_i64(Interp::new(&module).call_function(fid, &[RtValue::Int(n)]).unwrap());
        assert_eq!(expected, 45);

        let driver = Driver::new(DriverConfig { seed: Some(5), ..Default::default() });
        let report = driver.run(&mut module);
        assert_eq!(report.functions_flattened, 1);
        assert!(ReferenceVerifier.verify_module(&module).is_ok());

        let func = module.function(fid);
        assert!(func.blocks().all(|b| func.block(b).insts.iter().all(|i| !func.opcode(*i).is_phi())));

        let got = rt_as_i64(Interp::new(&module).call_function(fid, &[RtValue::Int(n)]).unwrap());
        assert_eq!(got, 45);
    }

    #[test]
    fn same_seed_produces_byte_identical_dispatcher_shape() {
        fn build() -> (Module, chakravyuha_ir::FunctionId) {
            let mut module = Module::new("branch");
            let mut f = Function::new("classify", vec![Type::I32], Some(Type::I32));
            let entry = f.entry();
            let then_block = f.create_block();
            let else_block = f.create_block();
            let zero = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: 0 }));
            let one = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: 1 }));
            let neg_one = Value::Const(module.add_constant(ConstantData::Int { ty: Type::I32, value: -1 }));
            {
                let mut b = Builder::new(&mut f, Cursor::AtBlockEnd(entry));
                let cond = b.icmp(IcmpPred::Sgt, Value::Param(0), zero);
                b.cond_br(cond, then_block, else_block);
            }
            Builder::new(&mut f, Cursor::AtBlockEnd(then_block)).ret(Some(one));
            Builder::new(&mut f, Cursor::AtBlockEnd(else_block)).ret(Some(neg_one));
            let fid = module.create_function(f);
            (module, fid)
        }

        let (mut a, fid_a) = build();
        let (mut b, fid_b) = build();

        Driver::new(DriverConfig { seed: Some(99), ..Default::default() }).run(&mut a);
        Driver::new(DriverConfig { seed: Some(99), ..Default::default() }).run(&mut b);

        let fa = a.function(fid_a);
        let fb = b.function(fid_b);
        assert_eq!(fa.block_count(), fb.block_count());
        assert_eq!(fa.flatten_info.unwrap().dispatch, fb.flatten_info.unwrap().dispatch);
        assert_eq!(fa.flatten_info.unwrap().default, fb.flatten_info.unwrap().default);
        for block in fa.blocks() {
            assert_eq!(format!("{:?}", fa.opcode(fa.terminator(block).unwrap())), format!("{:?}", fb.opcode(fb.terminator(block).unwrap())));
        }
    }

    #[test]
    fn indirect_branch_function_is_skipped_not_flattened() {
        let mut module = Module::new("ineligible");
        let mut f = Function::new("weird", vec![], None);
        let entry = f.entry();
        let second = f.create_block();
        Builder::new(&mut f, Cursor::AtBlockEnd(entry)).br(second);
        f.append_inst(second, Opcode::UnsupportedTerminator { mnemonic: "indirectbr".to_owned() });
        module.create_function(f);

        let driver = Driver::new(DriverConfig { seed: Some(3), ..Default::default() });
        let report = driver.run(&mut module);

        assert_eq!(report.functions_flattened, 0);
        assert_eq!(report.functions_skipped.len(), 1);
        let func = module.function(module.find_function("weird").unwrap());
        assert!(func.flatten_info.is_none());
    }
}
