use std::{cmp::Ordering, str::FromStr};

use openssl::{
    bn::{BigNum, BigNumContext},
    ec::{EcGroup, EcGroupRef, EcKey},
    ecdsa::EcdsaSig,
    hash::{hash, MessageDigest},
    nid::Nid,
    pkey::{PKey, Private},
    x509::{X509NameBuilder, X509ReqBuilder, X509},
};
use strum::{Display, EnumString};

use crate::{
    constants::crypto_properties::{
        DEFAULT_HASH_ALGORITHM, DEFAULT_SECURITY_LEVEL, HASH_ALGORITHM, SECURITY_LEVEL,
    },
    crypto::{CertificateInfo, CryptoError, CryptoSuite, PrivateKey},
    Properties,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum HashFamily {
    #[strum(serialize = "SHA2")]
    Sha2,
    #[strum(serialize = "SHA3")]
    Sha3,
}

/// ECDSA over the NIST curves, backed by OpenSSL.
///
/// Security level 256 selects P-256 and 384 selects P-384; the hash family
/// picks SHA-2 or SHA-3 at the matching output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenSslCryptoSuite {
    security_level: u32,
    hash_family: HashFamily,
}

impl Default for OpenSslCryptoSuite {
    fn default() -> Self {
        Self {
            security_level: 256,
            hash_family: HashFamily::Sha2,
        }
    }
}

impl OpenSslCryptoSuite {
    pub fn new(security_level: u32, hash_family: HashFamily) -> Result<Self, CryptoError> {
        if !matches!(security_level, 256 | 384) {
            return Err(CryptoError::UnsupportedSecurityLevel(
                security_level.to_string(),
            ));
        }
        Ok(Self {
            security_level,
            hash_family,
        })
    }

    /// Build a suite from string properties. Missing keys fall back to level
    /// 256 and the SHA2 family.
    pub fn from_properties(properties: &Properties) -> Result<Self, CryptoError> {
        let level = properties
            .get(SECURITY_LEVEL)
            .map(String::as_str)
            .unwrap_or(DEFAULT_SECURITY_LEVEL);
        let security_level = level
            .trim()
            .parse::<u32>()
            .map_err(|_| CryptoError::UnsupportedSecurityLevel(level.to_string()))?;

        let family = properties
            .get(HASH_ALGORITHM)
            .map(String::as_str)
            .unwrap_or(DEFAULT_HASH_ALGORITHM);
        let hash_family = HashFamily::from_str(family.trim())
            .map_err(|_| CryptoError::UnsupportedHashAlgorithm(family.to_string()))?;

        Self::new(security_level, hash_family)
    }

    pub fn security_level(&self) -> u32 {
        self.security_level
    }

    pub fn hash_family(&self) -> HashFamily {
        self.hash_family
    }

    fn curve(&self) -> Nid {
        match self.security_level {
            384 => Nid::SECP384R1,
            _ => Nid::X9_62_PRIME256V1,
        }
    }

    fn message_digest(&self) -> MessageDigest {
        match (self.hash_family, self.security_level) {
            (HashFamily::Sha2, 384) => MessageDigest::sha384(),
            (HashFamily::Sha2, _) => MessageDigest::sha256(),
            (HashFamily::Sha3, 384) => MessageDigest::sha3_384(),
            (HashFamily::Sha3, _) => MessageDigest::sha3_256(),
        }
    }

    fn load_key(key: &PrivateKey) -> Result<PKey<Private>, CryptoError> {
        Ok(PKey::private_key_from_pem(key.as_pem().as_bytes())?)
    }
}

impl CryptoSuite for OpenSslCryptoSuite {
    fn key_gen(&self) -> Result<PrivateKey, CryptoError> {
        let group = EcGroup::from_curve_name(self.curve())?;
        let ec_key = EcKey::generate(&group)?;
        let pkey = PKey::from_ec_key(ec_key)?;
        let pem = pkey.private_key_to_pem_pkcs8()?;

        Ok(PrivateKey::from_pem(
            String::from_utf8(pem).map_err(|_| CryptoError::NotUtf8)?,
        ))
    }

    fn sign(&self, key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let pkey = Self::load_key(key)?;
        let ec_key = pkey.ec_key().map_err(|_| CryptoError::NotAnEcKey)?;

        let digest = hash(self.message_digest(), message)?;
        let signature = EcdsaSig::sign(&digest, &ec_key)?;
        let signature = to_low_s(signature, ec_key.group())?;

        Ok(signature.to_der()?)
    }

    fn verify(
        &self,
        certificate_pem: &str,
        signature: &[u8],
        message: &[u8],
    ) -> Result<bool, CryptoError> {
        let certificate = X509::from_pem(certificate_pem.as_bytes())?;
        let ec_key = certificate
            .public_key()?
            .ec_key()
            .map_err(|_| CryptoError::NotAnEcKey)?;

        let signature = match EcdsaSig::from_der(signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };
        let digest = hash(self.message_digest(), message)?;

        Ok(signature.verify(&digest, &ec_key)?)
    }

    fn hash(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(hash(self.message_digest(), data)?.to_vec())
    }

    fn generate_certification_request(
        &self,
        subject: &str,
        key: &PrivateKey,
    ) -> Result<String, CryptoError> {
        let pkey = Self::load_key(key)?;

        let mut name_builder = X509NameBuilder::new()?;
        name_builder.append_entry_by_nid(Nid::COMMONNAME, subject)?;
        let name = name_builder.build();

        let mut builder = X509ReqBuilder::new()?;
        builder.set_version(0)?;
        builder.set_subject_name(&name)?;
        builder.set_pubkey(&pkey)?;
        builder.sign(&pkey, self.message_digest())?;

        let pem = builder.build().to_pem()?;
        String::from_utf8(pem).map_err(|_| CryptoError::NotUtf8)
    }

    fn certificate_info(&self, certificate_pem: &str) -> Result<CertificateInfo, CryptoError> {
        let certificate = X509::from_pem(certificate_pem.as_bytes())?;

        let serial_number = certificate
            .serial_number()
            .to_bn()?
            .to_hex_str()?
            .to_lowercase();
        let authority_key_identifier = certificate
            .authority_key_id()
            .map(|id| hex::encode(id.as_slice()));
        let subject_common_name = certificate
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .and_then(|entry| entry.data().as_utf8().ok())
            .map(|cn| cn.to_string());
        let public_key_der = certificate.public_key()?.public_key_to_der()?;

        Ok(CertificateInfo {
            serial_number,
            authority_key_identifier,
            subject_common_name,
            public_key_der,
        })
    }
}

/// Peers reject ECDSA signatures whose `s` lies in the upper half of the
/// curve order, so flip `s` to `n - s` when needed.
fn to_low_s(signature: EcdsaSig, group: &EcGroupRef) -> Result<EcdsaSig, CryptoError> {
    let mut ctx = BigNumContext::new()?;
    let mut order = BigNum::new()?;
    group.order(&mut order, &mut ctx)?;

    let mut half_order = BigNum::new()?;
    half_order.rshift1(&order)?;

    if signature.s().ucmp(&half_order) != Ordering::Greater {
        return Ok(signature);
    }

    let mut low_s = BigNum::new()?;
    low_s.checked_sub(&order, signature.s())?;
    let r = signature.r().to_owned()?;

    Ok(EcdsaSig::from_private_components(r, low_s)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn sign_then_verify_with_certificate() -> Result<(), CryptoError> {
        let suite = OpenSslCryptoSuite::default();
        let (key, certificate) = test_utils::self_signed_certificate("alice", true);

        let signature = suite.sign(&key, b"payload bytes")?;
        assert!(suite.verify(&certificate, &signature, b"payload bytes")?);
        assert!(!suite.verify(&certificate, &signature, b"other bytes")?);
        Ok(())
    }

    #[test]
    fn signatures_are_low_s() -> Result<(), CryptoError> {
        let suite = OpenSslCryptoSuite::default();
        let key = suite.key_gen()?;
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?;
        let mut ctx = BigNumContext::new()?;
        let mut order = BigNum::new()?;
        group.order(&mut order, &mut ctx)?;
        let mut half_order = BigNum::new()?;
        half_order.rshift1(&order)?;

        for i in 0..32u8 {
            let der = suite.sign(&key, &[i; 16])?;
            let signature = EcdsaSig::from_der(&der)?;
            assert_ne!(signature.s().ucmp(&half_order), Ordering::Greater);
        }
        Ok(())
    }

    #[test]
    fn certificate_info_reads_serial_and_aki() -> Result<(), CryptoError> {
        let suite = OpenSslCryptoSuite::default();
        let (_, certificate) = test_utils::self_signed_certificate("bob", true);

        let info = suite.certificate_info(&certificate)?;
        assert_eq!(info.serial_number, info.serial_number.to_lowercase());
        assert!(!info.serial_number.is_empty());
        assert!(info.authority_key_identifier.is_some());
        assert_eq!(info.subject_common_name.as_deref(), Some("bob"));

        let (_, without_aki) = test_utils::self_signed_certificate("carol", false);
        assert!(suite
            .certificate_info(&without_aki)?
            .authority_key_identifier
            .is_none());
        Ok(())
    }

    #[test]
    fn csr_carries_subject() -> Result<(), CryptoError> {
        let suite = OpenSslCryptoSuite::default();
        let key = suite.key_gen()?;
        let csr = suite.generate_certification_request("dave", &key)?;
        assert!(csr.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));

        let request = openssl::x509::X509Req::from_pem(csr.as_bytes())?;
        let public_key = request.public_key()?;
        assert!(request.verify(&public_key)?);
        Ok(())
    }

    #[test]
    fn properties_select_curve_and_hash() {
        let mut properties = Properties::new();
        let _ = properties.insert(SECURITY_LEVEL.to_string(), "384".to_string());
        let _ = properties.insert(HASH_ALGORITHM.to_string(), "sha3".to_string());
        let suite = OpenSslCryptoSuite::from_properties(&properties).unwrap();
        assert_eq!(suite.security_level(), 384);
        assert_eq!(suite.hash_family(), HashFamily::Sha3);
        assert_eq!(suite.hash(b"abc").unwrap().len(), 48);

        let _ = properties.insert(SECURITY_LEVEL.to_string(), "128".to_string());
        assert!(matches!(
            OpenSslCryptoSuite::from_properties(&properties),
            Err(CryptoError::UnsupportedSecurityLevel(_))
        ));
    }
}
