//! A mock endpoint for testing.

use crate::endpoint::ServerEndpoint;
use crate::error::{EndpointError, EndpointResult};
use fleetsync_model::ClientRecord;
use parking_lot::Mutex;

/// An in-memory [`ServerEndpoint`] with settable failure modes.
///
/// Successful upserts land in the client list (deduplicated by identity,
/// as a real panel would reject duplicates), so consecutive
/// reconciliation runs against the mock observe their own pushes, the
/// way they would against a real fleet.
pub struct MockEndpoint {
    name: String,
    clients: Mutex<Vec<ClientRecord>>,
    list_error: Mutex<Option<EndpointError>>,
    upsert_error: Mutex<Option<EndpointError>>,
    pushed: Mutex<Vec<(u32, ClientRecord)>>,
}

impl MockEndpoint {
    /// Creates an empty mock endpoint.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clients: Mutex::new(Vec::new()),
            list_error: Mutex::new(None),
            upsert_error: Mutex::new(None),
            pushed: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock endpoint seeded with clients.
    pub fn with_clients(name: impl Into<String>, clients: Vec<ClientRecord>) -> Self {
        let mock = Self::new(name);
        *mock.clients.lock() = clients;
        mock
    }

    /// Returns the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Makes every `list_clients` call fail with the given error
    /// (`None` restores success).
    pub fn set_list_error(&self, error: Option<EndpointError>) {
        *self.list_error.lock() = error;
    }

    /// Makes every `upsert_client` call fail with the given error
    /// (`None` restores success).
    pub fn set_upsert_error(&self, error: Option<EndpointError>) {
        *self.upsert_error.lock() = error;
    }

    /// Returns the current client list.
    pub fn clients(&self) -> Vec<ClientRecord> {
        self.clients.lock().clone()
    }

    /// Returns every upsert issued, successful or not, in order.
    pub fn pushed(&self) -> Vec<(u32, ClientRecord)> {
        self.pushed.lock().clone()
    }
}

impl ServerEndpoint for MockEndpoint {
    fn list_clients(&self, _inbound_id: u32) -> EndpointResult<Vec<ClientRecord>> {
        if let Some(err) = self.list_error.lock().clone() {
            return Err(err);
        }
        Ok(self.clients.lock().clone())
    }

    fn upsert_client(&self, inbound_id: u32, record: &ClientRecord) -> EndpointResult<()> {
        self.pushed.lock().push((inbound_id, record.clone()));

        if let Some(err) = self.upsert_error.lock().clone() {
            return Err(err);
        }

        let mut clients = self.clients.lock();
        let key = record.identity_key();
        if !clients.iter().any(|c| c.identity_key() == key) {
            clients.push(record.clone());
        }
        Ok(())
    }

    fn access_url(&self, _inbound_id: u32, record: &ClientRecord) -> EndpointResult<String> {
        Ok(format!(
            "vless://{}@{}.example.org:443#{}",
            record.credential_id, self.name, record.raw_identity
        ))
    }
}
