//! Error types for server endpoints.

use thiserror::Error;

/// Result type for endpoint operations.
pub type EndpointResult<T> = Result<T, EndpointError>;

/// Errors a server endpoint can report.
///
/// The engine treats all three variants identically (the server is
/// excluded from the current run's write plan without aborting the run),
/// so the taxonomy exists for operator reporting, not control flow.
#[derive(Error, Debug, Clone)]
pub enum EndpointError {
    /// Network failure or timeout; the server never responded.
    #[error("server unreachable: {message}")]
    Unreachable {
        /// Transport-level failure description.
        message: String,
    },

    /// Login or session was rejected.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The server responded but reported a failure (malformed request,
    /// duplicate client, quota, ...).
    #[error("API error: {0}")]
    Api(String),
}

impl EndpointError {
    /// Creates an unreachable-server error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Returns true if the server never responded.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    /// Returns true if credentials or the session were rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthFailed(_))
    }
}
