//! Error types for the relay

use thiserror::Error;

/// Main error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Nonce store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("RPC error on {network}: {message}")]
    Rpc { network: String, message: String },

    #[error("Broadcast rejected on {network}: {message}")]
    Broadcast { network: String, message: String },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// HTTP status code attached to this error kind
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::InvalidInput(_) => 400,
            _ => 500,
        }
    }

    /// Stable label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "config",
            RelayError::InvalidInput(_) => "invalid_input",
            RelayError::UnknownNetwork(_) => "unknown_network",
            RelayError::Store(_) => "store",
            RelayError::Rpc { .. } => "rpc",
            RelayError::Broadcast { .. } => "broadcast",
            RelayError::Signing(_) => "signing",
            RelayError::Internal(_) => "internal",
        }
    }
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_400() {
        let err = RelayError::InvalidInput("txHex is required".to_string());
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn unknown_network_maps_to_500() {
        let err = RelayError::UnknownNetwork("nonexistent-network".to_string());
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.kind(), "unknown_network");
    }

    #[test]
    fn messages_are_non_empty() {
        let err = RelayError::Broadcast {
            network: "testnet".to_string(),
            message: "nonce too low".to_string(),
        };
        assert!(!err.to_string().is_empty());
    }
}
