//! Error types for the `loom-core` crate.
//!
//! Registry and environment operations return [`EnvironmentError`] through
//! the [`Result`] alias. There are two families: fatal configuration errors
//! raised while constructing an environment, and invalid-argument errors
//! raised before any state is touched.

use loom_types::Phase;

/// Convenience alias for registry and environment results.
pub type Result<T, E = EnvironmentError> = core::result::Result<T, E>;

/// Errors raised by the phase registry and environment construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentError {
    /// The blackboard init marker is missing or carries another version.
    #[error(
        "environment conflict: expected init marker version {expected}, found {}; \
         mismatched versions or bootstrap was never run",
        .found.as_deref().unwrap_or("nothing")
    )]
    VersionConflict {
        /// Version this build expects.
        expected: String,
        /// Version found on the blackboard, if any.
        found: Option<String>,
    },

    /// Construction was attempted outside the domain that ran bootstrap.
    #[error(
        "wrong isolation boundary: environment built in domain {actual}, bootstrap ran in {}",
        .expected.as_deref().unwrap_or("no domain")
    )]
    WrongIsolationDomain {
        /// Domain recorded by bootstrap, if any.
        expected: Option<String>,
        /// Domain of the caller.
        actual: String,
    },

    /// A phase without an environment slot was passed to a phase operation.
    #[error("{operation}: cannot use the {phase} phase, it has no environment")]
    InvalidPhase {
        /// The operation that rejected the phase.
        operation: &'static str,
        /// The rejected phase.
        phase: Phase,
    },
}

impl EnvironmentError {
    /// Whether this is a fatal configuration error.
    ///
    /// Fatal errors mean the process is running against an inconsistent
    /// bootstrap and cannot continue. Invalid-argument errors are caller
    /// mistakes that left the registry untouched.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::VersionConflict { .. } | Self::WrongIsolationDomain { .. }
        )
    }
}
