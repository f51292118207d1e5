use std::time::Duration;

use fabric_sdk::{crypto::CryptoError, FabricSdkError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FabricCaClientError>;

/// Errors returned by the public CA client API.
///
/// Operation errors carry a human readable context (who, which url) and the
/// [`RequestError`] that caused them.
#[derive(Debug, Error)]
pub enum FabricCaClientError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Operation errors
    #[error("{message}")]
    Registration {
        message: String,
        #[source]
        source: RequestError,
    },
    #[error("{message}")]
    Enrollment {
        message: String,
        #[source]
        source: RequestError,
    },
    #[error("{message}")]
    Revocation {
        message: String,
        #[source]
        source: RequestError,
    },
    #[error("{message}")]
    GenerateCrl {
        message: String,
        #[source]
        source: RequestError,
    },
    #[error("{message}")]
    Info {
        message: String,
        #[source]
        source: RequestError,
    },
    #[error("{message}")]
    Identity {
        message: String,
        #[source]
        source: RequestError,
    },
    #[error("{message}")]
    Affiliation {
        message: String,
        #[source]
        source: RequestError,
    },

    // Wrapped errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Sdk(#[from] FabricSdkError),
}

impl FabricCaClientError {
    /// The underlying request failure, if this is an operation error.
    pub fn request_error(&self) -> Option<&RequestError> {
        match self {
            Self::Registration { source, .. }
            | Self::Enrollment { source, .. }
            | Self::Revocation { source, .. }
            | Self::GenerateCrl { source, .. }
            | Self::Info { source, .. }
            | Self::Identity { source, .. }
            | Self::Affiliation { source, .. } => Some(source),
            _ => None,
        }
    }

    /// HTTP status code of the failed request, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self.request_error() {
            Some(RequestError::Http { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// A single request/response exchange with the CA server failed.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The server answered with an error status or a malformed envelope.
    #[error("[HTTP Status Code: {status}] - {message}")]
    Http { status: u16, message: String },
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Request was cancelled")]
    Cancelled,
    #[error("Response is missing field {0}")]
    MissingField(&'static str),
    #[error("Certificate has no authority key identifier")]
    MissingAuthorityKeyIdentifier,
    #[error("Response field is not valid UTF-8")]
    NotUtf8,
    #[error("Transport error: {0}")]
    Transport(String),

    // Wrapped errors
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    #[error(transparent)]
    HttpBuild(#[from] http::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    TimeFormat(#[from] time::error::Format),
}
