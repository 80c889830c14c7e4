//! The server endpoint capability interface.

use crate::error::EndpointResult;
use fleetsync_model::ClientRecord;

/// One authenticated server, as the engine sees it.
///
/// An endpoint is constructed once per run per server; implementations
/// own whatever session or connection state the server requires and may
/// pool connections internally. Calls are blocking I/O. A hung server is
/// expected to eventually fail with [`Unreachable`] so the run can
/// proceed with the remaining servers.
///
/// [`Unreachable`]: crate::EndpointError::Unreachable
pub trait ServerEndpoint: Send + Sync {
    /// Fetches the full client list of the given inbound.
    fn list_clients(&self, inbound_id: u32) -> EndpointResult<Vec<ClientRecord>>;

    /// Creates the client on the given inbound, or accepts it as already
    /// present. Re-pushing an existing identity must be harmless.
    fn upsert_client(&self, inbound_id: u32, record: &ClientRecord) -> EndpointResult<()>;

    /// Derives the connection URL for a client on this server, for the
    /// caller to render or deliver.
    fn access_url(&self, inbound_id: u32, record: &ClientRecord) -> EndpointResult<String>;
}
