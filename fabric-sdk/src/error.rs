use thiserror::Error;

use crate::crypto::CryptoError;

pub type Result<T> = std::result::Result<T, FabricSdkError>;

#[derive(Debug, Error)]
pub enum FabricSdkError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    // Precondition errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Proposal error: {0}")]
    Proposal(String),
    #[error("Network configuration error: {0}")]
    NetworkConfiguration(String),

    // Message errors
    #[error("Protocol message is missing field {0}")]
    MissingField(&'static str),

    // TLS errors
    #[error("Invalid private key")]
    InvalidPrivateKey,

    // Wrapped errors
    #[error("Failed to decode protocol message: {0}")]
    Deserialization(#[from] prost::DecodeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    SerdeYaml(#[from] serde_yaml::Error),
}

impl FabricSdkError {
    pub(crate) fn network_config(message: impl Into<String>) -> Self {
        Self::NetworkConfiguration(message.into())
    }
}
