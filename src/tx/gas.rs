//! Gas pricing with cached fallback
//!
//! A price-feed hiccup must not abort a relay: on a failed read the
//! oracle returns the last value it saw for that network, or a fixed
//! default before the first successful read. Staleness is preferred
//! over failure.

use crate::chain::NetworkClient;

use dashmap::DashMap;
use ethers::types::U256;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default gas price used before any successful read: 20 Gwei
pub const DEFAULT_GAS_PRICE_WEI: u64 = 20_000_000_000;

struct CachedPrice {
    price: U256,
    updated_at: Instant,
}

/// Process-local gas price oracle with a per-network cache
pub struct GasPriceOracle {
    cache: DashMap<String, CachedPrice>,
}

impl GasPriceOracle {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    /// Current gas price for a network. Never fails: an RPC failure
    /// falls back to the cached value, or the default on first use.
    pub async fn current_price(&self, network: &str, client: &dyn NetworkClient) -> U256 {
        match client.get_gas_price().await {
            Ok(price) => {
                self.cache.insert(
                    network.to_string(),
                    CachedPrice {
                        price,
                        updated_at: Instant::now(),
                    },
                );
                debug!("Gas price for {}: {} wei", network, price);
                crate::metrics::record_gas_price(network, price.low_u64() as f64);
                price
            }
            Err(e) => {
                crate::metrics::record_gas_fallback(network);
                let age = self.cache_age(network);
                match self.cache.get(network) {
                    Some(cached) => {
                        warn!(
                            "Gas price read failed for {}: {}; using value cached {:?} ago",
                            network,
                            e,
                            age.unwrap_or_default()
                        );
                        cached.price
                    }
                    None => {
                        warn!(
                            "Gas price read failed for {}: {}; using default {} wei",
                            network, e, DEFAULT_GAS_PRICE_WEI
                        );
                        U256::from(DEFAULT_GAS_PRICE_WEI)
                    }
                }
            }
        }
    }

    /// Age of the cached price for a network, if any
    pub fn cache_age(&self, network: &str) -> Option<Duration> {
        self.cache.get(network).map(|c| c.updated_at.elapsed())
    }
}

impl Default for GasPriceOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::client::MockNetworkClient;
    use crate::error::RelayError;

    fn rpc_failure() -> RelayError {
        RelayError::Rpc {
            network: "testnet".to_string(),
            message: "connection refused".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_read_is_returned_and_cached() {
        let oracle = GasPriceOracle::new();
        let mut client = MockNetworkClient::new();
        client
            .expect_get_gas_price()
            .times(1)
            .returning(|| Ok(U256::from(42_000_000_000u64)));

        let price = oracle.current_price("testnet", &client).await;
        assert_eq!(price, U256::from(42_000_000_000u64));
        assert!(oracle.cache_age("testnet").is_some());
    }

    #[tokio::test]
    async fn first_use_failure_returns_default() {
        let oracle = GasPriceOracle::new();
        let mut client = MockNetworkClient::new();
        client
            .expect_get_gas_price()
            .times(1)
            .returning(|| Err(rpc_failure()));

        let price = oracle.current_price("testnet", &client).await;
        assert_eq!(price, U256::from(DEFAULT_GAS_PRICE_WEI));
    }

    #[tokio::test]
    async fn failure_after_success_returns_cached_value() {
        let oracle = GasPriceOracle::new();

        let mut ok_client = MockNetworkClient::new();
        ok_client
            .expect_get_gas_price()
            .returning(|| Ok(U256::from(7_000_000_000u64)));
        oracle.current_price("testnet", &ok_client).await;

        let mut failing_client = MockNetworkClient::new();
        failing_client
            .expect_get_gas_price()
            .returning(|| Err(rpc_failure()));

        let price = oracle.current_price("testnet", &failing_client).await;
        assert_eq!(price, U256::from(7_000_000_000u64));
    }

    #[tokio::test]
    async fn caches_are_per_network() {
        let oracle = GasPriceOracle::new();

        let mut ok_client = MockNetworkClient::new();
        ok_client
            .expect_get_gas_price()
            .returning(|| Ok(U256::from(9u64)));
        oracle.current_price("mainnet", &ok_client).await;

        let mut failing_client = MockNetworkClient::new();
        failing_client
            .expect_get_gas_price()
            .returning(|| Err(rpc_failure()));

        // testnet has no cached value yet, so the default applies
        let price = oracle.current_price("testnet", &failing_client).await;
        assert_eq!(price, U256::from(DEFAULT_GAS_PRICE_WEI));
    }
}
