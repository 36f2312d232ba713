//! Network registry - one RPC client per configured network
//!
//! Clients are created once at startup from the static network table
//! and reused for the process lifetime. The mapping is not
//! hot-reloadable.

pub mod client;

pub use client::{HttpNetworkClient, NetworkClient};

use crate::config::Settings;
use crate::error::{RelayError, RelayResult};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Fixed mapping from network name to RPC client
pub struct NetworkRegistry {
    clients: HashMap<String, Arc<dyn NetworkClient>>,
}

impl NetworkRegistry {
    /// Build one client per configured network
    pub fn from_settings(settings: &Settings) -> RelayResult<Self> {
        let mut clients: HashMap<String, Arc<dyn NetworkClient>> = HashMap::new();

        for (name, network) in &settings.networks {
            let client = HttpNetworkClient::new(name, network, &settings.relayer)?;
            clients.insert(name.clone(), Arc::new(client));
            info!("Initialized RPC client for network {}", name);
        }

        if clients.is_empty() {
            return Err(RelayError::Config(
                "At least one network must be configured".to_string(),
            ));
        }

        Ok(Self { clients })
    }

    /// Registry over pre-built clients, used by tests to inject mocks
    #[cfg(test)]
    pub fn with_clients(clients: HashMap<String, Arc<dyn NetworkClient>>) -> Self {
        Self { clients }
    }

    /// Resolve the client for a network name
    pub fn client(&self, name: &str) -> RelayResult<Arc<dyn NetworkClient>> {
        self.clients
            .get(name)
            .cloned()
            .ok_or_else(|| RelayError::UnknownNetwork(name.to_string()))
    }

    /// Names of all registered networks
    pub fn networks(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }
}
