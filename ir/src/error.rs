use thiserror::Error;

use crate::{Block, Inst};

/// Misuse of the builder/arena APIs, or a verifier rejection.
#[derive(Debug, Error)]
pub enum IrError {
    #[error("block {0:?} has no terminator")]
    MissingTerminator(Block),

    #[error("instruction {0:?} is not a terminator")]
    NotATerminator(Inst),

    #[error("instruction {0:?} does not belong to function {1:?}")]
    InstNotInFunction(Inst, String),

    #[error("block {0:?} does not belong to function {1:?}")]
    BlockNotInFunction(Block, String),

    #[error("verification failed for function `{function}`: {reason}")]
    VerificationFailed { function: String, reason: String },
}
