//! Key vault - HD key derivation and transaction signing
//!
//! The vault owns the only copy of the signing key. Callers hand it
//! transaction bytes and get back a signed, serialized transaction;
//! the private key never crosses the vault boundary and is never
//! logged.

use crate::error::{RelayError, RelayResult};

use ethers::signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes};

/// Holds the HD signing key derived from the seed phrase
pub struct KeyVault {
    wallet: LocalWallet,
}

impl std::fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVault")
            .field("address", &self.address())
            .finish()
    }
}

impl KeyVault {
    /// Derive the signing key from a BIP-39 seed phrase.
    ///
    /// Derivation is deterministic: the same phrase always yields the
    /// same address and the same signatures for the same payload.
    pub fn from_phrase(phrase: &str) -> RelayResult<Self> {
        if phrase.trim().is_empty() {
            return Err(RelayError::Config("Seed phrase is not set".to_string()));
        }

        let wallet = MnemonicBuilder::<English>::default()
            .phrase(phrase)
            .build()
            .map_err(|e| RelayError::Config(format!("Invalid seed phrase: {}", e)))?;

        Ok(Self { wallet })
    }

    /// Public address of the signing key
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Sign a prepared transaction and return the serialized signed form.
    ///
    /// CPU-bound; honors an EIP-155 chain id already present on the
    /// transaction.
    pub fn sign(&self, tx: &TypedTransaction) -> RelayResult<Bytes> {
        let signature = self
            .wallet
            .sign_transaction_sync(tx)
            .map_err(|e| RelayError::Signing(e.to_string()))?;

        Ok(tx.rlp_signed(&signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::TransactionRequest;

    const TEST_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn derivation_is_deterministic() {
        let a = KeyVault::from_phrase(TEST_PHRASE).unwrap();
        let b = KeyVault::from_phrase(TEST_PHRASE).unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn known_phrase_yields_known_address() {
        // BIP-39 test vector at the default path m/44'/60'/0'/0/0
        let vault = KeyVault::from_phrase(TEST_PHRASE).unwrap();
        assert_eq!(
            format!("{:?}", vault.address()),
            "0x9858effd232b4033e47d90003d41ec34ecaeda94"
        );
    }

    #[test]
    fn signing_is_deterministic() {
        let vault = KeyVault::from_phrase(TEST_PHRASE).unwrap();

        let tx: TypedTransaction = TransactionRequest::new()
            .to("0x0000000000000000000000000000000000000001"
                .parse::<Address>()
                .unwrap())
            .value(1u64)
            .gas(21_000u64)
            .gas_price(20_000_000_000u64)
            .nonce(0u64)
            .into();

        let first = vault.sign(&tx).unwrap();
        let second = vault.sign(&tx).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_phrase_is_a_config_error() {
        let err = KeyVault::from_phrase("definitely not a valid mnemonic").unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn empty_phrase_is_rejected() {
        assert!(KeyVault::from_phrase("  ").is_err());
    }
}
