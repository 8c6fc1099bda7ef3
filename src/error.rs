//! Error types for omnichain token operations

use thiserror::Error;

/// Main error type for deployment and bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Unknown network: {network}")]
    UnknownNetwork { network: String },

    #[error("Unknown token: {token}")]
    UnknownToken { token: String },

    #[error("Token {token} is not configured for network {network}")]
    UnconfiguredDeployment { token: String, network: String },

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("No {service} entry in the endpoint directory for network {network}")]
    EndpointNotFound { network: String, service: String },

    #[error("No deployment record for {deployment} on network {network}")]
    DeploymentNotFound {
        deployment: String,
        network: String,
    },

    #[error("Invalid address {value}: {message}")]
    InvalidAddress { value: String, message: String },

    #[error("Invalid amount {value}: {message}")]
    InvalidAmount { value: String, message: String },

    #[error("RPC error on network {network}: {message}")]
    Rpc { network: String, message: String },

    #[error("Transaction {tx_hash} reverted on network {network}")]
    Reverted { network: String, tx_hash: String },

    #[error("Transaction dropped before confirmation on network {network}")]
    Dropped { network: String },

    #[error("ABI decoding error: {0}")]
    Abi(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Deployment store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// True for errors detected from configuration alone, before any
    /// transaction is sent. These are never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BridgeError::UnknownNetwork { .. }
                | BridgeError::UnknownToken { .. }
                | BridgeError::UnconfiguredDeployment { .. }
                | BridgeError::InvalidDescriptor(_)
                | BridgeError::EndpointNotFound { .. }
                | BridgeError::InvalidAddress { .. }
                | BridgeError::InvalidAmount { .. }
        )
    }

}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
