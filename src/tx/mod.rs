//! Transaction pipeline: nonce allocation, gas pricing, signing, broadcast

pub mod gas;
pub mod nonce;
pub mod sender;
pub mod signer;

pub use gas::GasPriceOracle;
pub use nonce::{NonceAllocator, NonceSource};
pub use sender::Broadcaster;
pub use signer::TransactionSigner;
