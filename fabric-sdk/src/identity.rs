//! Identities that can sign for transactions and CA requests.

use crate::crypto::PrivateKey;

/// A (private key, signed certificate) pair proving network identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    key: PrivateKey,
    certificate: String,
}

impl Enrollment {
    pub fn new(key: PrivateKey, certificate: impl Into<String>) -> Self {
        Self {
            key,
            certificate: certificate.into(),
        }
    }

    pub fn key(&self) -> &PrivateKey {
        &self.key
    }

    /// PEM encoded certificate.
    pub fn certificate(&self) -> &str {
        &self.certificate
    }
}

/// Capability interface for an identity known to the network.
pub trait User: Send + Sync {
    fn name(&self) -> &str;

    /// Membership service provider the identity belongs to.
    fn msp_id(&self) -> &str;

    fn enrollment(&self) -> Option<&Enrollment>;

    fn roles(&self) -> &[String] {
        &[]
    }

    fn account(&self) -> Option<&str> {
        None
    }

    fn affiliation(&self) -> Option<&str> {
        None
    }
}

/// A plain in-memory [`User`].
///
/// Network configuration produces these for registrars and peer admins, and
/// applications can build their own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInfo {
    name: String,
    msp_id: String,
    enroll_secret: Option<String>,
    roles: Vec<String>,
    account: Option<String>,
    affiliation: Option<String>,
    enrollment: Option<Enrollment>,
}

impl UserInfo {
    pub fn new(name: impl Into<String>, msp_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            msp_id: msp_id.into(),
            ..Default::default()
        }
    }

    pub fn with_enroll_secret(mut self, secret: impl Into<String>) -> Self {
        self.enroll_secret = Some(secret.into());
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_enrollment(mut self, enrollment: Enrollment) -> Self {
        self.enrollment = Some(enrollment);
        self
    }

    pub fn set_enrollment(&mut self, enrollment: Enrollment) {
        self.enrollment = Some(enrollment);
    }

    pub fn enroll_secret(&self) -> Option<&str> {
        self.enroll_secret.as_deref()
    }
}

impl User for UserInfo {
    fn name(&self) -> &str {
        &self.name
    }

    fn msp_id(&self) -> &str {
        &self.msp_id
    }

    fn enrollment(&self) -> Option<&Enrollment> {
        self.enrollment.as_ref()
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }

    fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    fn affiliation(&self) -> Option<&str> {
        self.affiliation.as_deref()
    }
}
