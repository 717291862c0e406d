//! Verification errors
//!
//! Only one condition stops a run: more than one canary entry found at the
//! canary DN before the write. Everything else is recorded as a negative
//! outcome and the traversal moves on.

use thiserror::Error;

use super::result::ResultTree;

/// Result type for a verification run
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Run-aborting errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Leftover canary entries indicate external state corruption
    #[error(
        "{found} entries found at the test entry DN on {supplier} ({instance}, {base_dn}). Expected 1."
    )]
    GarbageInvariant {
        instance: String,
        base_dn: String,
        supplier: String,
        found: usize,
        /// Units visited before the abort
        partial: ResultTree,
    },
}

impl VerifyError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            VerifyError::GarbageInvariant { .. } => 255,
        }
    }

    /// Results gathered before the run stopped
    pub fn partial_results(&self) -> &ResultTree {
        match self {
            VerifyError::GarbageInvariant { partial, .. } => partial,
        }
    }
}
