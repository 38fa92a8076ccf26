//! The Driver (spec.md §2, §4.7): runs SE over a module, then CFF over
//! each eligible function, then asks the host to verify. SE and CFF
//! don't communicate beyond both mutating the same module (spec.md
//! §4.7) — the ordering matters because SE introduces stack allocas and
//! calls whose dominance is trivial, so it must run before CFF's CFG
//! rewrite has to account for them.

use chakravyuha_ir::{Module, ReferenceVerifier, Verifier};

use crate::cff::{self, FlattenConfig};
use crate::report::{Report, GLOBAL_REPORT};
use crate::rng::{EntropySource, OsEntropy, SeededEntropy};
use crate::se::{self, StringEncryptConfig};

#[derive(Clone, Debug, Default)]
pub struct DriverConfig {
    pub se: StringEncryptConfig,
    pub cff: FlattenConfig,
    /// Drives both the SE key and the flattener's id shuffle (spec.md
    /// §5: "the core must expose an optional fixed seed so tests can
    /// reproduce output byte-for-byte").
    pub seed: Option<u64>,
}

pub struct Driver {
    config: DriverConfig,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        Driver { config }
    }

    /// Runs the full pipeline over `module`, mutating it in place, and
    /// returns this run's report. The same totals are folded into
    /// [`GLOBAL_REPORT`] so a host that drives several modules can read
    /// a running total.
    pub fn run(&self, module: &mut Module) -> Report {
        let mut entropy: Box<dyn EntropySource> = match self.config.seed {
            Some(seed) => Box::new(SeededEntropy::new(seed)),
            None => Box::new(OsEntropy::new()),
        };
        let verifier = ReferenceVerifier;

        let mut report = se::run(module, &self.config.se, entropy.as_mut());
        cff::run(module, &self.config.cff, entropy.as_mut(), &verifier, &mut report);

        if let Err(e) = verifier.verify_module(module) {
            log::error!("module `{}` failed final verification after the driver ran: {e}", module.name);
        }

        GLOBAL_REPORT.lock().expect("report mutex poisoned").merge(&report);
        report
    }
}
