//! JSON-RPC client for a single network

use crate::config::{NetworkConfig, RelayerConfig};
use crate::error::{RelayError, RelayResult};

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Bytes, H256, U256};
use std::time::Duration;
use url::Url;

#[cfg(test)]
use mockall::automock;

/// Capability interface every network client implements.
///
/// The registry is polymorphic over this trait so tests can substitute
/// a mock transport for the real JSON-RPC provider.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Balance of an account in wei
    async fn get_balance(&self, address: Address) -> RelayResult<U256>;

    /// Current network gas price in wei
    async fn get_gas_price(&self) -> RelayResult<U256>;

    /// Submit a signed raw transaction, returning its hash
    async fn send_raw(&self, raw: Bytes) -> RelayResult<H256>;
}

impl std::fmt::Debug for dyn NetworkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NetworkClient")
    }
}

/// HTTP JSON-RPC client with explicit connect/request timeouts
pub struct HttpNetworkClient {
    network: String,
    provider: Provider<Http>,
}

impl HttpNetworkClient {
    pub fn new(
        network: &str,
        config: &NetworkConfig,
        relayer: &RelayerConfig,
    ) -> RelayResult<Self> {
        let url = Url::parse(&config.rpc_url).map_err(|e| {
            RelayError::Config(format!("Invalid RPC URL for network {}: {}", network, e))
        })?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(relayer.rpc_connect_timeout_secs))
            .timeout(Duration::from_secs(relayer.rpc_request_timeout_secs))
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let provider = Provider::new(Http::new_with_client(url, http_client));

        Ok(Self {
            network: network.to_string(),
            provider,
        })
    }

    fn rpc_error(&self, e: impl std::fmt::Display) -> RelayError {
        RelayError::Rpc {
            network: self.network.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl NetworkClient for HttpNetworkClient {
    async fn get_balance(&self, address: Address) -> RelayResult<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| self.rpc_error(e))
    }

    async fn get_gas_price(&self) -> RelayResult<U256> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| self.rpc_error(e))
    }

    async fn send_raw(&self, raw: Bytes) -> RelayResult<H256> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| RelayError::Broadcast {
                network: self.network.clone(),
                message: e.to_string(),
            })?;

        Ok(pending.tx_hash())
    }
}
