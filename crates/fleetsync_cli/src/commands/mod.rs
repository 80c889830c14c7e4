//! CLI command implementations.

pub mod add_user;
pub mod list_users;
pub mod reconcile;

use crate::config::FleetConfig;
use crate::http::ReqwestClient;
use fleetsync_endpoint::{PanelCredentials, PanelEndpoint, ServerEndpoint};
use fleetsync_engine::{FleetServer, Reconciler};
use fleetsync_store::DirectoryStore;
use std::sync::Arc;
use std::time::Duration;

/// Per-request timeout for panel calls.
const PANEL_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds a reconciler over the configured fleet, one authenticated
/// endpoint per server, in configuration order.
pub fn build_reconciler(config: &FleetConfig) -> Result<Reconciler, Box<dyn std::error::Error>> {
    let mut servers = Vec::new();

    for server in &config.servers {
        let client = ReqwestClient::new(PANEL_TIMEOUT)?;
        let endpoint = PanelEndpoint::new(
            server.name.clone(),
            server.base_url.clone(),
            PanelCredentials::new(server.username.clone(), server.password.clone()),
            client,
        );
        servers.push(FleetServer::new(
            server.name.clone(),
            server.inbound_id,
            Arc::new(endpoint) as Arc<dyn ServerEndpoint>,
        ));
    }

    let store = DirectoryStore::open(&config.store_path, true)?;
    Ok(Reconciler::new(servers, store))
}
