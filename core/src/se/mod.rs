//! String Encryption (spec.md §4.1–4.3): replace constant string globals
//! with XOR-encrypted ciphertext globals, synthesize an in-module
//! decryption routine, and rewrite every use to decrypt-on-demand.

pub mod collector;
pub mod decrypt_stub;
pub mod rewriter;

pub use collector::StringEncryptConfig;

use chakravyuha_ir::Module;

use crate::report::Report;
use crate::rng::EntropySource;

/// Runs SE over the whole module: collect eligible globals, synthesize
/// (or reuse) the decrypt stub, and rewrite every collected global.
/// Idempotent per spec.md §8: a global already replaced no longer has a
/// constant-string initializer under its original name, so a second run
/// collects nothing new.
pub fn run(module: &mut Module, config: &StringEncryptConfig, entropy: &mut dyn EntropySource) -> Report {
    let mut report = Report::default();
    let eligible = collector::collect_eligible_strings(module, config);
    if eligible.is_empty() {
        return report;
    }

    let (stub, key) = decrypt_stub::ensure_decrypt_stub(module, entropy, config.key_override);

    for gid in eligible {
        rewriter::rewrite_global(module, gid, stub, key, &mut report);
    }

    report
}
