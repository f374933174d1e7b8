//! Error types for the hearth-effects crate.
//!
//! The registry and applier never fail toward their callers: lookup misses
//! degrade to no-ops. The only fallible collaborator call is a store's
//! forced save, which reports through [`PortError`].

/// Errors reported by the session and room stores.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// A store failed to persist its state.
    #[error("{store} store failed to save: {reason}")]
    SaveFailed {
        /// Which store failed (`sessions` or `rooms`).
        store: &'static str,
        /// Description of the failure.
        reason: String,
    },

    /// A store is not reachable at all.
    #[error("{store} store unavailable")]
    Unavailable {
        /// Which store is unavailable.
        store: &'static str,
    },
}
