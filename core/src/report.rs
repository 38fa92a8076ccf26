//! The in-memory counters spec.md §4.3/§5 names, plus the process-wide
//! aggregator spec.md §5 calls "a process-wide, lazily initialized
//! report aggregator". Emission (to JSON or otherwise) is the external
//! report collaborator's job (spec.md §1); this module only accumulates.

use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFunction {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Report {
    pub strings_encrypted: u64,
    pub plaintext_bytes: u64,
    pub ciphertext_bytes: u64,
    pub se_method: Option<String>,
    pub functions_flattened: u64,
    pub blocks_flattened: u64,
    pub functions_skipped: Vec<SkippedFunction>,
}

impl Report {
    pub fn record_string_encrypted(&mut self, plaintext_len: usize, ciphertext_len: usize) {
        self.strings_encrypted += 1;
        self.plaintext_bytes += plaintext_len as u64;
        self.ciphertext_bytes += ciphertext_len as u64;
        self.se_method.get_or_insert_with(|| "XOR with dynamic per-run key".to_owned());
    }

    pub fn record_function_flattened(&mut self, block_count: usize) {
        self.functions_flattened += 1;
        self.blocks_flattened += block_count as u64;
    }

    pub fn record_function_skipped(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.functions_skipped.push(SkippedFunction { name: name.into(), reason: reason.into() });
    }

    /// Folds `other` into `self`, for accumulating a single module's
    /// report into the process-wide aggregator.
    pub fn merge(&mut self, other: &Report) {
        self.strings_encrypted += other.strings_encrypted;
        self.plaintext_bytes += other.plaintext_bytes;
        self.ciphertext_bytes += other.ciphertext_bytes;
        if self.se_method.is_none() {
            self.se_method = other.se_method.clone();
        }
        self.functions_flattened += other.functions_flattened;
        self.blocks_flattened += other.blocks_flattened;
        self.functions_skipped.extend(other.functions_skipped.iter().cloned());
    }
}

/// A process may drive the obfuscator over several modules (spec.md §5);
/// this aggregates across every `Driver::run` call. Single-threaded
/// hosts need no further locking beyond the mutex already here; a host
/// that invokes the plugin concurrently across modules should lock once
/// per module rather than per field, which this `Mutex<Report>` already
/// provides.
pub static GLOBAL_REPORT: Lazy<Mutex<Report>> = Lazy::new(|| Mutex::new(Report::default()));
