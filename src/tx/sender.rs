//! Broadcast of signed raw transactions
//!
//! Single attempt per call. The underlying RPC error is surfaced
//! unchanged so the caller owns the retry/backoff policy.

use crate::chain::NetworkRegistry;
use crate::error::{RelayError, RelayResult};

use ethers::types::{Bytes, H256};
use std::sync::Arc;
use tracing::info;

/// Submits signed raw transactions to their target network
pub struct Broadcaster {
    registry: Arc<NetworkRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<NetworkRegistry>) -> Self {
        Self { registry }
    }

    /// Submit a signed raw transaction, returning its hash.
    ///
    /// The hex encoding is normalized to the 0x prefix convention
    /// before submission.
    pub async fn submit(&self, signed_raw: &str, network: &str) -> RelayResult<H256> {
        let client = self.registry.client(network)?;

        let bare = signed_raw.trim_start_matches("0x");
        let bytes = hex::decode(bare).map_err(|e| {
            RelayError::InvalidInput(format!("signed transaction is not valid hex: {}", e))
        })?;

        let tx_hash = client.send_raw(Bytes::from(bytes)).await?;
        info!("Broadcast to {}: {:?}", network, tx_hash);
        crate::metrics::record_tx_submitted(network);

        Ok(tx_hash)
    }
}
