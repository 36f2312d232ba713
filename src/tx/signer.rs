//! Transaction signing sequence
//!
//! A relay request moves through four strictly sequential steps:
//! decode the caller's unsigned payload, price it, nonce it, sign it.
//! Pricing never fails (the oracle falls back to its cache); a nonce
//! allocation failure aborts the request, since nonces must never be
//! guessed. An allocated nonce is not rolled back when a later step
//! fails - the caller retries the whole sequence with a fresh nonce.

use super::gas::GasPriceOracle;
use super::nonce::NonceSource;
use crate::chain::NetworkClient;
use crate::error::{RelayError, RelayResult};
use crate::vault::KeyVault;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{TransactionRequest, U256};
use ethers::utils::rlp::Rlp;
use std::sync::Arc;
use tracing::debug;

/// Fixed gas limit applied to every relayed transaction.
///
/// A single conservative constant, not a per-transaction estimate.
/// Known simplification carried over from the original service.
pub const RELAY_GAS_LIMIT: u64 = 3_000_000;

/// Turns an unsigned transaction payload into a signed raw transaction
pub struct TransactionSigner {
    vault: Arc<KeyVault>,
    nonces: Arc<dyn NonceSource>,
    gas: Arc<GasPriceOracle>,
}

impl TransactionSigner {
    pub fn new(
        vault: Arc<KeyVault>,
        nonces: Arc<dyn NonceSource>,
        gas: Arc<GasPriceOracle>,
    ) -> Self {
        Self { vault, nonces, gas }
    }

    /// Sign an unsigned transaction hex for a network, returning the
    /// signed raw transaction as a hex string (no 0x prefix).
    pub async fn sign_request(
        &self,
        tx_hex: &str,
        network: &str,
        client: &dyn NetworkClient,
    ) -> RelayResult<String> {
        // Received: decode the caller-supplied unsigned payload
        let raw = hex::decode(tx_hex.trim_start_matches("0x"))
            .map_err(|e| RelayError::InvalidInput(format!("txHex is not valid hex: {}", e)))?;
        let rlp = Rlp::new(&raw);
        let mut tx = TransactionRequest::decode_unsigned_rlp(&rlp).map_err(|e| {
            RelayError::InvalidInput(format!("txHex is not an unsigned transaction: {}", e))
        })?;

        // Priced: never fails, cached fallback inside the oracle
        let gas_price = self.gas.current_price(network, client).await;

        // Nonced: allocator failure aborts the request
        let sender = format!("{:?}", self.vault.address());
        let nonce = self.nonces.allocate(&sender, network).await?;

        tx.gas = Some(U256::from(RELAY_GAS_LIMIT));
        tx.gas_price = Some(gas_price);
        tx.nonce = Some(U256::from(nonce));

        // Signed
        let typed = TypedTransaction::Legacy(tx);
        let signed = self.vault.sign(&typed)?;

        debug!(
            "Signed transaction for {} with nonce {} at {} wei",
            network, nonce, gas_price
        );

        Ok(hex::encode(signed))
    }
}
