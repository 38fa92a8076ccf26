//! SE: StringCollector (spec.md §4.1). Enumerates constant global string
//! initializers eligible for encryption.

use chakravyuha_ir::{ConstantData, GlobalId, Module};

/// Per-module knobs spec.md's Open Questions call out: a key override for
/// reproducible test runs, and an optional name-prefix filter for
/// compatibility with the name-filtered variant spec.md §9 mentions but
/// does not adopt by default.
#[derive(Clone, Debug, Default)]
pub struct StringEncryptConfig {
    /// Overrides the entropy source's key for this module. Only meant for
    /// tests that need a known ciphertext.
    pub key_override: Option<u8>,
    /// When set, only globals whose name starts with this prefix are
    /// eligible (the `.str`-prefix-filtered variant).
    pub filter_by_prefix: Option<String>,
}

/// A global is eligible iff it is constant, has an initializer, and that
/// initializer is a byte array the IR model recognizes as a
/// null-terminated string (spec.md §4.1). Name-based filtering is a
/// heuristic, off unless `config.filter_by_prefix` is set.
pub fn collect_eligible_strings(module: &Module, config: &StringEncryptConfig) -> Vec<GlobalId> {
    module.globals().filter(|&gid| is_eligible(module, gid, config)).collect()
}

fn is_eligible(module: &Module, gid: GlobalId, config: &StringEncryptConfig) -> bool {
    let g = module.global(gid);
    if !g.is_constant {
        return false;
    }
    let Some(init) = g.initializer else {
        return false;
    };
    let is_string = matches!(module.constant(init), ConstantData::CString { nul_terminated: true, .. });
    if !is_string {
        return false;
    }
    match &config.filter_by_prefix {
        Some(prefix) => g.name.starts_with(prefix.as_str()),
        None => true,
    }
}
