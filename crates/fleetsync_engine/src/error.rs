//! Error types for the reconciliation engine.

use fleetsync_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a reconciliation run.
///
/// Per-server and per-identity endpoint failures are *not* here; they
/// are recorded in the run report and the run degrades to best effort.
/// Only store failures and whole-run conditions abort.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The local directory could not be read or written. Fatal: the run
    /// aborts without applying the local-store plan.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No configured server produced a client list this run. An empty
    /// aggregate is indistinguishable from universal absence, so nothing
    /// can be safely planned or persisted.
    #[error("no configured server could be reached")]
    NoReachableServers,

    /// A run is already in progress on this engine.
    #[error("a reconciliation run is already in progress")]
    RunInProgress,

    /// The run was cancelled before the local store was written; no
    /// persisted state changed.
    #[error("run cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            EngineError::NoReachableServers.to_string(),
            "no configured server could be reached"
        );
        assert!(EngineError::Cancelled.to_string().contains("cancelled"));
    }

    #[test]
    fn store_errors_convert() {
        let err: EngineError = StoreError::Locked.into();
        assert!(matches!(err, EngineError::Store(StoreError::Locked)));
    }
}
