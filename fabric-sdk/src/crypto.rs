//! The cryptographic capability consumed by the transaction context and the
//! CA client.
//!
//! Everything above this module talks to a [`CryptoSuite`] trait object. The
//! default implementation is [`OpenSslCryptoSuite`]; suites are handed out and
//! cached by an explicitly constructed [`CryptoSuiteFactory`].

mod factory;
mod openssl_suite;

pub use factory::CryptoSuiteFactory;
pub use openssl_suite::{HashFamily, OpenSslCryptoSuite};

use std::fmt::Debug;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors that arise in the cryptography module.
#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    #[error("Unsupported security level: {0}")]
    UnsupportedSecurityLevel(String),
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),
    #[error("Private key is not an elliptic curve key")]
    NotAnEcKey,
    #[error("Encoded value is not valid UTF-8")]
    NotUtf8,

    // Wrapped errors
    #[error(transparent)]
    OpenSsl(#[from] openssl::error::ErrorStack),
}

/// A PKCS#8 PEM encoded private key. The key material is wiped on drop and
/// never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn from_pem(pem: impl Into<String>) -> Self {
        Self(pem.into())
    }

    pub fn as_pem(&self) -> &str {
        &self.0
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// Fields extracted from an X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// Serial number as lower-case hex.
    pub serial_number: String,
    /// Authority key identifier extension as lower-case hex, when present.
    pub authority_key_identifier: Option<String>,
    pub subject_common_name: Option<String>,
    pub public_key_der: Vec<u8>,
}

/// Key generation, signing, hashing and certificate parsing.
pub trait CryptoSuite: Send + Sync + Debug {
    /// Generate a fresh signing key.
    fn key_gen(&self) -> Result<PrivateKey, CryptoError>;

    /// Sign `message` with `key`. The message is hashed by the suite; the
    /// result is a DER encoded ECDSA signature.
    fn sign(&self, key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Check `signature` over `message` against the public key in
    /// `certificate_pem`.
    fn verify(
        &self,
        certificate_pem: &str,
        signature: &[u8],
        message: &[u8],
    ) -> Result<bool, CryptoError>;

    fn hash(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Build a PEM certificate signing request with common name `subject`.
    fn generate_certification_request(
        &self,
        subject: &str,
        key: &PrivateKey,
    ) -> Result<String, CryptoError>;

    fn certificate_info(&self, certificate_pem: &str) -> Result<CertificateInfo, CryptoError>;
}
