//! Persistent nonce allocation
//!
//! Nonces are issued per (address, network) pair from a Postgres table
//! with a single atomic insert-or-increment, so concurrent callers
//! serialize on the row instead of racing on read-then-write. First
//! allocation for a pair yields 0; later ones count up with step 1.
//!
//! A caller that allocates a nonce and then fails to broadcast has
//! still consumed it. The allocator never reclaims or retries.

use crate::config::DatabaseConfig;
use crate::error::{RelayError, RelayResult};

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

/// Source of unique, monotonically increasing nonces
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NonceSource: Send + Sync {
    /// Fails fast when the store connection string is not configured,
    /// before any store or network access.
    fn ensure_configured(&self) -> RelayResult<()>;

    /// Allocate the next nonce for an (address, network) pair
    async fn allocate(&self, address: &str, network: &str) -> RelayResult<u64>;
}

/// Postgres-backed nonce allocator
pub struct NonceAllocator {
    pool: Option<PgPool>,
}

impl NonceAllocator {
    /// Connect a pool to the configured store.
    ///
    /// An empty connection string is tolerated here so the process can
    /// start; every allocation then fails with a configuration error
    /// until one is provided.
    pub async fn connect(config: &DatabaseConfig) -> RelayResult<Self> {
        if config.url.is_empty() {
            warn!("Nonce store connection string is not set - allocations will fail");
            return Ok(Self { pool: None });
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        Ok(Self { pool: Some(pool) })
    }

    /// Allocator with no store behind it
    #[cfg(test)]
    pub fn disconnected() -> Self {
        Self { pool: None }
    }

    /// Allocator over an existing pool
    #[cfg(test)]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool: Some(pool) }
    }

    /// Create the nonce table if it does not exist
    pub async fn ensure_schema(&self) -> RelayResult<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nonces (
                address TEXT NOT NULL,
                network TEXT NOT NULL,
                nonce BIGINT NOT NULL,
                PRIMARY KEY (address, network)
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl NonceSource for NonceAllocator {
    fn ensure_configured(&self) -> RelayResult<()> {
        if self.pool.is_none() {
            return Err(RelayError::Config(
                "Nonce store connection string is not configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn allocate(&self, address: &str, network: &str) -> RelayResult<u64> {
        if address.is_empty() {
            return Err(RelayError::InvalidInput("address is required".to_string()));
        }
        if network.is_empty() {
            return Err(RelayError::InvalidInput("network is required".to_string()));
        }
        let Some(pool) = &self.pool else {
            return Err(RelayError::Config(
                "Nonce store connection string is not configured".to_string(),
            ));
        };

        // One scoped connection per call, released on every exit path
        // when it drops back to the pool.
        let mut conn = pool.acquire().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO nonces (address, network, nonce)
            VALUES ($1, $2, 0)
            ON CONFLICT (address, network) DO UPDATE
                SET nonce = nonces.nonce + 1
              WHERE nonces.address = $1
                AND nonces.network = $2
            RETURNING nonce
            "#,
        )
        .bind(address)
        .bind(network)
        .fetch_one(&mut *conn)
        .await?;

        let nonce = row.get::<i64, _>("nonce") as u64;
        debug!("Allocated nonce {} for {} on {}", nonce, address, network);
        crate::metrics::record_nonce_allocated(network);

        Ok(nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn empty_address_is_rejected_before_store_access() {
        let allocator = NonceAllocator::disconnected();
        let err = allocator.allocate("", "testnet").await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn empty_network_is_rejected_before_store_access() {
        let allocator = NonceAllocator::disconnected();
        let err = allocator.allocate("0xabc", "").await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unconfigured_store_is_a_config_error() {
        let allocator = NonceAllocator::disconnected();
        assert!(matches!(
            allocator.ensure_configured(),
            Err(RelayError::Config(_))
        ));

        let err = allocator.allocate("0xabc", "testnet").await.unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    async fn test_allocator() -> NonceAllocator {
        let url = std::env::var("TX_RELAY_TEST_PG_URL")
            .expect("set TX_RELAY_TEST_PG_URL to run store tests");
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(&url)
            .await
            .expect("connect to test store");
        let allocator = NonceAllocator::from_pool(pool);
        allocator.ensure_schema().await.expect("create schema");
        allocator
    }

    fn fresh_address(tag: &str) -> String {
        // A pair never used before stands in for a fresh store.
        format!(
            "0xtest-{}-{}",
            tag,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        )
    }

    #[tokio::test]
    #[ignore = "requires a postgres instance; set TX_RELAY_TEST_PG_URL"]
    async fn sequential_allocations_count_up_from_zero() {
        let allocator = test_allocator().await;
        let address = fresh_address("seq");

        for expected in 0..5u64 {
            let nonce = allocator.allocate(&address, "testnet").await.unwrap();
            assert_eq!(nonce, expected);
        }
    }

    #[tokio::test]
    #[ignore = "requires a postgres instance; set TX_RELAY_TEST_PG_URL"]
    async fn concurrent_allocations_never_collide() {
        let allocator = Arc::new(test_allocator().await);
        let address = fresh_address("conc");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let allocator = allocator.clone();
            let address = address.clone();
            handles.push(tokio::spawn(async move {
                allocator.allocate(&address, "testnet").await.unwrap()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            let nonce = handle.await.unwrap();
            assert!(seen.insert(nonce), "duplicate nonce {}", nonce);
        }
        assert_eq!(seen.len(), 16);
    }

    #[tokio::test]
    #[ignore = "requires a postgres instance; set TX_RELAY_TEST_PG_URL"]
    async fn pairs_do_not_share_counters() {
        let allocator = test_allocator().await;
        let address = fresh_address("pair");

        assert_eq!(allocator.allocate(&address, "testnet").await.unwrap(), 0);
        assert_eq!(allocator.allocate(&address, "mainnet").await.unwrap(), 0);
        assert_eq!(allocator.allocate(&address, "testnet").await.unwrap(), 1);
    }
}
