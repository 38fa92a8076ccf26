use thiserror::Error;

/// The four error kinds spec.md §7 enumerates. None of these escape
/// `Driver::run`: every variant is logged and counted, then the driver
/// moves on to the next function or the next global.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("function `{function}` is ineligible for flattening: {reason}")]
    IneligibleInput { function: String, reason: String },

    #[error("use of global `{global}` by {user} could not be rewritten: {reason}")]
    UnrewritableUse { global: String, user: String, reason: String },

    #[error("function `{function}` failed verification after flattening: {reason}")]
    VerificationFailed { function: String, reason: String },

    #[error("function `{function}` hit an internal invariant violation: {reason}")]
    InvariantViolation { function: String, reason: String },
}
