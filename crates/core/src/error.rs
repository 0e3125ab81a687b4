//! Error types for rendezvous operations.
//!
//! Conflicts and explicit retries never appear here: the transaction engine
//! resolves both internally. What remains are failures a caller can act on
//! (bad configuration, a failed helper task, an invalid snapshot) and the
//! handful of conditions that indicate a bug.

use crate::types::HelperId;
use thiserror::Error;

/// All rendezvous errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A gate or group was created with a capacity it cannot honour
    #[error("invalid capacity: {0} (must be at least 1)")]
    InvalidCapacity(u32),

    /// A restored state violates its invariants
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A helper's task action failed; the helper's current cycle is abandoned
    #[error("helper {helper} task failed: {reason}")]
    TaskFailed {
        /// Helper whose task failed
        helper: HelperId,
        /// Failure reported by the task
        reason: String,
    },

    /// A forked transaction panicked before handing off its result
    #[error("forked transaction panicked: {0}")]
    ForkPanicked(String),

    /// The coordinator was given nothing to escort
    #[error("coordinator needs at least one pool")]
    NoPools,

    /// Configuration rejected at load or validation time
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for rendezvous operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a task failure for `helper`.
    pub fn task_failed(helper: HelperId, reason: impl Into<String>) -> Self {
        Error::TaskFailed {
            helper,
            reason: reason.into(),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only task failures are: the helper that hit one may be restarted and
    /// join a later generation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TaskFailed { .. })
    }

    /// Check if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_) | Error::InvalidCapacity(_) | Error::NoPools)
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_) | Error::ForkPanicked(_))
    }
}
