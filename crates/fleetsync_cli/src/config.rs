//! Fleet configuration file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Connection settings for one panel.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConnectionConfig {
    /// Server name, unique within the fleet.
    pub name: String,
    /// Panel base URL.
    pub base_url: String,
    /// Panel account name.
    pub username: String,
    /// Panel account password.
    pub password: String,
    /// The inbound holding this fleet's clients.
    pub inbound_id: u32,
}

/// The fleet configuration file (YAML).
///
/// Server order in the file is configuration order; it decides which
/// server's record becomes the replication template for an identity seen
/// on more than one server.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    /// Servers, in configuration order.
    pub servers: Vec<ServerConnectionConfig>,
    /// Directory store location.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data")
}

/// Loads and normalizes the YAML fleet configuration.
pub fn load_config(path: &Path) -> Result<FleetConfig, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    let mut config: FleetConfig = serde_yaml::from_str(&raw)?;

    for server in &mut config.servers {
        server.base_url = server.base_url.trim_end_matches('/').to_string();
    }

    Ok(config)
}
