//! The part of the host plugin contract (spec.md §6) that is not plugin
//! registration glue: pass names, the `PreservedAnalyses` result the
//! host's pass manager expects back, and a `ModulePass` trait each
//! concrete pass implements. The FFI/dynamic-registration handshake a
//! real host optimizer needs is out of scope (spec.md §1); `PluginInfo`
//! exists only so an embedder can see the shape.

use chakravyuha_ir::{Module, ReferenceVerifier, Verifier};

use crate::cff::{self, FlattenConfig};
use crate::report::GLOBAL_REPORT;
use crate::rng::{EntropySource, OsEntropy, SeededEntropy};
use crate::se::{self, StringEncryptConfig};

pub mod pass_names {
    pub const STRING_ENCRYPT: &str = "chakravyuha-string-encrypt";
    pub const CONTROL_FLOW_FLATTEN: &str = "chakravyuha-control-flow-flatten";
    pub const ALL: &str = "chakravyuha-all";
}

/// What `ModulePass::run` reports back to the host's pass manager: did
/// this pass leave analyses (e.g. dominator trees) intact, or does
/// everything downstream need to be recomputed because IR was mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreservedAnalyses {
    All,
    None,
}

pub trait ModulePass {
    fn name(&self) -> &'static str;
    fn run(&self, module: &mut Module) -> PreservedAnalyses;
}

fn make_entropy(seed: Option<u64>) -> Box<dyn EntropySource> {
    match seed {
        Some(seed) => Box::new(SeededEntropy::new(seed)),
        None => Box::new(OsEntropy::new()),
    }
}

pub struct StringEncryptPass {
    pub config: StringEncryptConfig,
    pub seed: Option<u64>,
}

impl ModulePass for StringEncryptPass {
    fn name(&self) -> &'static str {
        pass_names::STRING_ENCRYPT
    }

    fn run(&self, module: &mut Module) -> PreservedAnalyses {
        let mut entropy = make_entropy(self.seed);
        let report = se::run(module, &self.config, entropy.as_mut());
        let mutated = report.strings_encrypted > 0;
        GLOBAL_REPORT.lock().expect("report mutex poisoned").merge(&report);
        if mutated { PreservedAnalyses::None } else { PreservedAnalyses::All }
    }
}

pub struct ControlFlowFlattenPass {
    pub config: FlattenConfig,
    pub seed: Option<u64>,
}

impl ModulePass for ControlFlowFlattenPass {
    fn name(&self) -> &'static str {
        pass_names::CONTROL_FLOW_FLATTEN
    }

    fn run(&self, module: &mut Module) -> PreservedAnalyses {
        let mut entropy = make_entropy(self.seed);
        let verifier = ReferenceVerifier;
        let mut report = crate::report::Report::default();
        cff::run(module, &self.config, entropy.as_mut(), &verifier, &mut report);
        let mutated = report.functions_flattened > 0;
        GLOBAL_REPORT.lock().expect("report mutex poisoned").merge(&report);
        if mutated { PreservedAnalyses::None } else { PreservedAnalyses::All }
    }
}

pub struct AllPass {
    pub driver: crate::driver::Driver,
}

impl ModulePass for AllPass {
    fn name(&self) -> &'static str {
        pass_names::ALL
    }

    fn run(&self, module: &mut Module) -> PreservedAnalyses {
        let report = self.driver.run(module);
        if report.strings_encrypted > 0 || report.functions_flattened > 0 {
            PreservedAnalyses::None
        } else {
            PreservedAnalyses::All
        }
    }
}

/// Declares the plugin's identity to a host pipeline; carries no
/// behavior of its own (spec.md §1's "host plugin registration glue" is
/// out of scope).
#[derive(Clone, Debug)]
pub struct PluginInfo {
    pub name: &'static str,
    pub version: &'static str,
}

pub const PLUGIN_INFO: PluginInfo = PluginInfo { name: "chakravyuha", version: env!("CARGO_PKG_VERSION") };
