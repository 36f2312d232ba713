//! Relay service - the single inbound operation
//!
//! Explicitly constructed once at startup, owning its registry, vault,
//! allocator and oracle; request handlers receive it by reference.

use crate::chain::NetworkRegistry;
use crate::error::{RelayError, RelayResult};
use crate::tx::{Broadcaster, GasPriceOracle, NonceSource, TransactionSigner};
use crate::vault::KeyVault;

use ethers::types::{Address, U256};
use serde::Deserialize;
use std::sync::Arc;

/// Inbound relay request
#[derive(Debug, Clone, Deserialize)]
pub struct RelayRequest {
    #[serde(rename = "txHex")]
    pub tx_hex: String,
    pub blockchain: String,
}

/// Per-network balance of the relay's signing address
pub struct NetworkBalance {
    pub network: String,
    pub balance: Option<U256>,
}

/// Coordinates key vault, nonce allocator, gas oracle and broadcaster
pub struct RelayService {
    registry: Arc<NetworkRegistry>,
    vault: Arc<KeyVault>,
    nonces: Arc<dyn NonceSource>,
    signer: TransactionSigner,
    broadcaster: Broadcaster,
}

impl RelayService {
    pub fn new(
        registry: Arc<NetworkRegistry>,
        vault: Arc<KeyVault>,
        nonces: Arc<dyn NonceSource>,
        gas: Arc<GasPriceOracle>,
    ) -> Self {
        let signer = TransactionSigner::new(vault.clone(), nonces.clone(), gas);
        let broadcaster = Broadcaster::new(registry.clone());

        Self {
            registry,
            vault,
            nonces,
            signer,
            broadcaster,
        }
    }

    /// Sign and broadcast one transaction, returning its 0x-prefixed hash
    pub async fn relay(&self, request: &RelayRequest) -> RelayResult<String> {
        crate::metrics::record_relay_received(&request.blockchain);

        let result = self.relay_inner(request).await;
        if let Err(e) = &result {
            crate::metrics::record_relay_failed(&request.blockchain, e.kind());
        }
        result
    }

    async fn relay_inner(&self, request: &RelayRequest) -> RelayResult<String> {
        if request.tx_hex.trim().is_empty() {
            return Err(RelayError::InvalidInput("txHex is required".to_string()));
        }

        let client = self.registry.client(&request.blockchain)?;

        // Configuration problems must surface before any store or
        // network I/O is attempted.
        self.nonces.ensure_configured()?;

        let signed = self
            .signer
            .sign_request(&request.tx_hex, &request.blockchain, client.as_ref())
            .await?;

        let tx_hash = self
            .broadcaster
            .submit(&signed, &request.blockchain)
            .await?;

        Ok(format!("{:?}", tx_hash))
    }

    /// Address the relay signs with
    pub fn signer_address(&self) -> Address {
        self.vault.address()
    }

    /// Signing-address balance on every configured network
    pub async fn balances(&self) -> Vec<NetworkBalance> {
        let address = self.vault.address();
        let mut balances = Vec::new();

        for network in self.registry.networks() {
            let balance = match self.registry.client(&network) {
                Ok(client) => client.get_balance(address).await.ok(),
                Err(_) => None,
            };
            balances.push(NetworkBalance { network, balance });
        }

        balances
    }
}
