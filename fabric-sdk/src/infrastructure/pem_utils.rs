//! Convenience functions for dealing with PEM files.

use std::{io::BufReader, path::Path};

use rustls::Certificate;
use rustls_pemfile::Item;

use crate::{error::Result, FabricSdkError};

/// Returns all certificates in the pemfile at the given path
pub fn read_certificates(path: impl AsRef<Path>) -> Result<Vec<Certificate>> {
    let fd = std::fs::File::open(path.as_ref())?;
    let mut buf = BufReader::new(&fd);
    let certs = rustls_pemfile::certs(&mut buf)?
        .into_iter()
        .map(Certificate)
        .collect();

    Ok(certs)
}

/// Returns all certificates in an in-memory PEM bundle
pub fn read_certificates_from_bytes(pem: &[u8]) -> Result<Vec<Certificate>> {
    let mut buf = BufReader::new(pem);
    let certs = rustls_pemfile::certs(&mut buf)?
        .into_iter()
        .map(Certificate)
        .collect();

    Ok(certs)
}

/// Checks that `pem` holds a private key (PKCS#8, SEC1 or PKCS#1) and returns
/// it unchanged as a string.
pub fn validate_private_key_pem(pem: &[u8]) -> Result<String> {
    let mut buf = BufReader::new(pem);
    let mut found = false;
    while let Some(item) = rustls_pemfile::read_one(&mut buf)? {
        if matches!(item, Item::PKCS8Key(_) | Item::ECKey(_) | Item::RSAKey(_)) {
            found = true;
            break;
        }
    }

    if !found {
        return Err(FabricSdkError::InvalidPrivateKey);
    }
    String::from_utf8(pem.to_vec()).map_err(|_| FabricSdkError::InvalidPrivateKey)
}

/// Checks that `pem` holds at least one certificate and returns it as a
/// string.
pub fn validate_certificate_pem(pem: &[u8]) -> Result<String> {
    if read_certificates_from_bytes(pem)?.is_empty() {
        return Err(FabricSdkError::InvalidArgument(
            "no certificate found in PEM input".to_string(),
        ));
    }
    String::from_utf8(pem.to_vec())
        .map_err(|_| FabricSdkError::InvalidArgument("certificate is not UTF-8".to_string()))
}
