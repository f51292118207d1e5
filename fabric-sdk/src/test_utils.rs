//! Throwaway keys, certificates and users for tests.
//!
//! These helpers panic on failure; they are only compiled for tests and the
//! `test-utils` feature.

use openssl::{
    asn1::Asn1Time,
    bn::{BigNum, MsbOption},
    hash::MessageDigest,
    nid::Nid,
    pkey::PKey,
    x509::{
        extension::{AuthorityKeyIdentifier, SubjectKeyIdentifier},
        X509NameBuilder, X509,
    },
};

use crate::{
    crypto::{CryptoSuite, OpenSslCryptoSuite, PrivateKey},
    identity::{Enrollment, UserInfo},
};

/// Generate a P-256 key and a self-signed certificate with common name
/// `common_name`. The authority key identifier extension is only added when
/// `with_authority_key_id` is set.
pub fn self_signed_certificate(common_name: &str, with_authority_key_id: bool) -> (PrivateKey, String) {
    let suite = OpenSslCryptoSuite::default();
    let key = suite.key_gen().unwrap();
    let pkey = PKey::private_key_from_pem(key.as_pem().as_bytes()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, common_name).unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let mut serial = BigNum::new().unwrap();
    serial.rand(128, MsbOption::MAYBE_ZERO, false).unwrap();
    builder
        .set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    builder.set_pubkey(&pkey).unwrap();

    let ski = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(ski).unwrap();
    if with_authority_key_id {
        let aki = AuthorityKeyIdentifier::new()
            .keyid(true)
            .build(&builder.x509v3_context(None, None))
            .unwrap();
        builder.append_extension(aki).unwrap();
    }

    builder.sign(&pkey, MessageDigest::sha256()).unwrap();
    let pem = builder.build().to_pem().unwrap();

    (key, String::from_utf8(pem).unwrap())
}

/// A user with a fresh self-signed enrollment.
pub fn enrolled_user(name: &str, msp_id: &str) -> UserInfo {
    let (key, certificate) = self_signed_certificate(name, true);
    UserInfo::new(name, msp_id).with_enrollment(Enrollment::new(key, certificate))
}
