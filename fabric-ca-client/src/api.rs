//! Full implementation of the public API for the CA client library.
//!
//! Every operation validates its arguments locally first; an
//! [`FabricCaClientError::InvalidArgument`] means no request was sent. Any
//! failure after that point is reported as the operation's own error variant
//! wrapping the [`RequestError`](crate::error::RequestError) that caused it.

mod affiliations;
mod enroll;
mod gencrl;
mod identities;
mod info;
mod reenroll;
mod register;
mod revoke;

use fabric_sdk::{
    identity::{Enrollment, User},
    infrastructure::logging,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::{error::RequestError, FabricCaClient, FabricCaClientError, Result};

pub use self::{
    affiliations::AffiliationInfo,
    enroll::{AttributeRequest, EnrollmentRequest},
    gencrl::GenerateCrlRequest,
    identities::IdentityInfo,
    info::CaInfoResponse,
    register::{attributes, identity_types, Attribute, RegistrationRequest},
    revoke::{RevokeOptions, RevokeResponse},
};

impl FabricCaClient {
    /// Register a new identity. `registrar` must be enrolled and allowed to
    /// register identities of the requested type.
    ///
    /// Output: the enrollment secret of the new identity.
    #[instrument(skip_all, err(Debug), fields(enrollment_id, registrar))]
    pub async fn register(
        &self,
        request: &RegistrationRequest,
        registrar: &dyn User,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if request.enrollment_id.is_empty() {
            return Err(FabricCaClientError::InvalidArgument(
                "EnrollmentID cannot be null or empty".to_string(),
            ));
        }
        let enrollment = registrar_enrollment(registrar)?;
        logging::record_field("enrollment_id", &request.enrollment_id);
        logging::record_field("registrar", &registrar.name());

        info!("Starting register protocol.");
        self.set_up_tls().await?;
        let secret = self
            .handle_register(request, enrollment, cancel)
            .await
            .map_err(|source| FabricCaClientError::Registration {
                message: format!(
                    "Error while registering the user {} url: {}",
                    registrar.name(),
                    self.config().base_url()
                ),
                source,
            })?;

        info!("Successfully completed register protocol.");
        Ok(secret)
    }

    /// Enroll `user` with the secret it was registered with.
    ///
    /// A key pair and certificate signing request are generated unless the
    /// request supplies them. The private key never leaves this process.
    #[instrument(skip_all, err(Debug), fields(user))]
    pub async fn enroll(
        &self,
        user: &str,
        secret: &str,
        request: EnrollmentRequest,
        cancel: &CancellationToken,
    ) -> Result<Enrollment> {
        if user.is_empty() {
            return Err(FabricCaClientError::InvalidArgument(
                "enrollment user is not set".to_string(),
            ));
        }
        if secret.is_empty() {
            return Err(FabricCaClientError::InvalidArgument(
                "enrollment secret is not set".to_string(),
            ));
        }
        if request.csr.is_some() && request.key.is_none() {
            return Err(FabricCaClientError::InvalidArgument(
                "If certificate signing request is supplied the key pair needs to be supplied too."
                    .to_string(),
            ));
        }
        logging::record_field("user", &user);

        info!("Starting enroll protocol.");
        self.set_up_tls().await?;
        let enrollment = self
            .handle_enroll(user, secret, request, cancel)
            .await
            .map_err(|source| FabricCaClientError::Enrollment {
                message: format!(
                    "Url:{}, Failed to enroll user {user}",
                    self.config().base_url()
                ),
                source,
            })?;

        info!("Successfully completed enroll protocol.");
        Ok(enrollment)
    }

    /// Get a new certificate for an enrolled `user`, authenticated by its
    /// current one. The key pair is kept unless the request supplies a new
    /// one.
    ///
    /// A generated signing request names `user.name()` as its subject, not
    /// the common name of the current certificate.
    #[instrument(skip_all, err(Debug), fields(user))]
    pub async fn reenroll(
        &self,
        user: &dyn User,
        request: EnrollmentRequest,
        cancel: &CancellationToken,
    ) -> Result<Enrollment> {
        let enrollment = user.enrollment().ok_or_else(|| {
            FabricCaClientError::InvalidArgument(
                "reenrollment user is not a valid user object".to_string(),
            )
        })?;
        if request.csr.is_some() && request.key.is_none() {
            return Err(FabricCaClientError::InvalidArgument(
                "If certificate signing request is supplied the key pair needs to be supplied too."
                    .to_string(),
            ));
        }
        logging::record_field("user", &user.name());

        info!("Starting reenroll protocol.");
        self.set_up_tls().await?;
        let enrollment = self
            .handle_reenroll(user.name(), enrollment, request, cancel)
            .await
            .map_err(|source| FabricCaClientError::Enrollment {
                message: format!("Failed to re-enroll user {}", user.name()),
                source,
            })?;

        info!("Successfully completed reenroll protocol.");
        Ok(enrollment)
    }

    /// Revoke the certificate of `enrollment`. Serial number and authority
    /// key identifier are read from the certificate.
    #[instrument(skip_all, err(Debug), fields(revoker))]
    pub async fn revoke_enrollment(
        &self,
        revoker: &dyn User,
        enrollment: &Enrollment,
        options: &RevokeOptions,
        cancel: &CancellationToken,
    ) -> Result<RevokeResponse> {
        let revoker_enrollment = revoker_enrollment(revoker)?;
        logging::record_field("revoker", &revoker.name());

        info!("Starting revoke protocol.");
        self.set_up_tls().await?;
        let (serial, aki) = self.certificate_ids(enrollment).map_err(|source| {
            FabricCaClientError::Revocation {
                message: format!("Error while revoking cert. {source}"),
                source,
            }
        })?;
        let target = revoke::Target::Certificate {
            serial: &serial,
            aki: &aki,
        };
        let response = self
            .revoke_target(revoker_enrollment, target, options, cancel)
            .await?;

        info!("Successfully completed revoke protocol.");
        Ok(response)
    }

    /// Revoke every certificate of the identity `revokee`.
    #[instrument(skip_all, err(Debug), fields(revoker, revokee))]
    pub async fn revoke_identity(
        &self,
        revoker: &dyn User,
        revokee: &str,
        options: &RevokeOptions,
        cancel: &CancellationToken,
    ) -> Result<RevokeResponse> {
        if revokee.is_empty() {
            return Err(FabricCaClientError::InvalidArgument(
                "revokee user is not set".to_string(),
            ));
        }
        let revoker_enrollment = revoker_enrollment(revoker)?;
        logging::record_field("revoker", &revoker.name());
        logging::record_field("revokee", &revokee);

        info!("Starting revoke protocol.");
        self.set_up_tls().await?;
        let response = self
            .revoke_target(
                revoker_enrollment,
                revoke::Target::Identity(revokee),
                options,
                cancel,
            )
            .await?;

        info!("Successfully completed revoke protocol.");
        Ok(response)
    }

    /// Revoke the certificate identified by `serial` (hex) and `aki`
    /// (authority key identifier, hex).
    #[instrument(skip_all, err(Debug), fields(revoker, serial))]
    pub async fn revoke_certificate(
        &self,
        revoker: &dyn User,
        serial: &str,
        aki: &str,
        options: &RevokeOptions,
        cancel: &CancellationToken,
    ) -> Result<RevokeResponse> {
        if serial.is_empty() {
            return Err(FabricCaClientError::InvalidArgument(
                "Serial number is required to revoke certificate".to_string(),
            ));
        }
        if aki.is_empty() {
            return Err(FabricCaClientError::InvalidArgument(
                "AKI is required to revoke certificate".to_string(),
            ));
        }
        let revoker_enrollment = revoker_enrollment(revoker)?;
        logging::record_field("revoker", &revoker.name());
        logging::record_field("serial", &serial);

        info!("Starting revoke protocol.");
        self.set_up_tls().await?;
        let response = self
            .revoke_target(
                revoker_enrollment,
                revoke::Target::Certificate { serial, aki },
                options,
                cancel,
            )
            .await?;

        info!("Successfully completed revoke protocol.");
        Ok(response)
    }

    /// Shared tail of the revoke operations.
    async fn revoke_target(
        &self,
        revoker: &Enrollment,
        target: revoke::Target<'_>,
        options: &RevokeOptions,
        cancel: &CancellationToken,
    ) -> Result<RevokeResponse> {
        self.handle_revoke(revoker, target, options, cancel)
            .await
            .map_err(|source| {
                let message = match &source {
                    RequestError::MissingField("result") if options.gen_crl => {
                        "Failed to return CRL, revoke response is empty".to_string()
                    }
                    RequestError::MissingField("CRL") => "Failed to return CRL".to_string(),
                    _ => format!("Error while revoking the user. {source}"),
                };
                FabricCaClientError::Revocation { message, source }
            })
    }

    /// Generate a certificate revocation list. Only the filters set on
    /// `request` are sent.
    ///
    /// Output: the CRL as returned by the server (base64 PEM).
    #[instrument(skip_all, err(Debug), fields(registrar))]
    pub async fn generate_crl(
        &self,
        registrar: &dyn User,
        request: &GenerateCrlRequest,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let enrollment = registrar_enrollment(registrar)?;
        logging::record_field("registrar", &registrar.name());

        info!("Starting gencrl protocol.");
        self.set_up_tls().await?;
        let crl = self
            .handle_generate_crl(enrollment, request, cancel)
            .await
            .map_err(|source| FabricCaClientError::GenerateCrl {
                message: format!("Failed to generate CRL: {source}"),
                source,
            })?;

        info!("Successfully completed gencrl protocol.");
        Ok(crl)
    }

    /// Information about the CA. No credentials are needed.
    #[instrument(skip_all, err(Debug))]
    pub async fn info(&self, cancel: &CancellationToken) -> Result<CaInfoResponse> {
        info!("Starting cainfo protocol.");
        self.set_up_tls().await?;
        let info = self
            .handle_info(cancel)
            .await
            .map_err(|source| FabricCaClientError::Info {
                message: format!("Url:{}, Failed to get info", self.config().base_url()),
                source,
            })?;

        info!("Successfully completed cainfo protocol.");
        Ok(info)
    }

    /// Every identity `registrar` is allowed to see.
    #[instrument(skip_all, err(Debug), fields(registrar))]
    pub async fn identities(
        &self,
        registrar: &dyn User,
        cancel: &CancellationToken,
    ) -> Result<Vec<IdentityInfo>> {
        let enrollment = registrar_enrollment(registrar)?;
        logging::record_field("registrar", &registrar.name());

        info!("Starting identities protocol.");
        self.set_up_tls().await?;
        let identities = self
            .handle_identities(enrollment, cancel)
            .await
            .map_err(|source| FabricCaClientError::Identity {
                message: query_error_message("users", self.config().base_url(), &source),
                source,
            })?;

        info!("Successfully completed identities protocol.");
        Ok(identities)
    }

    /// The affiliation tree `registrar` is allowed to see.
    #[instrument(skip_all, err(Debug), fields(registrar))]
    pub async fn affiliations(
        &self,
        registrar: &dyn User,
        cancel: &CancellationToken,
    ) -> Result<AffiliationInfo> {
        let enrollment = registrar_enrollment(registrar)?;
        logging::record_field("registrar", &registrar.name());

        info!("Starting affiliations protocol.");
        self.set_up_tls().await?;
        let affiliations = self
            .handle_affiliations(enrollment, cancel)
            .await
            .map_err(|source| FabricCaClientError::Affiliation {
                message: query_error_message("affiliations", self.config().base_url(), &source),
                source,
            })?;

        info!("Successfully completed affiliations protocol.");
        Ok(affiliations)
    }
}

fn registrar_enrollment(registrar: &dyn User) -> Result<&Enrollment> {
    registrar.enrollment().ok_or_else(|| {
        FabricCaClientError::InvalidArgument("Registrar should be a valid member".to_string())
    })
}

fn revoker_enrollment(revoker: &dyn User) -> Result<&Enrollment> {
    revoker.enrollment().ok_or_else(|| {
        FabricCaClientError::InvalidArgument("revoker is not set".to_string())
    })
}

fn query_error_message(what: &str, url: &str, source: &RequestError) -> String {
    match source {
        RequestError::Http { status, message } => format!(
            "[HTTP Status Code: {status}] - Error while getting all {what} from url '{url}': {message}"
        ),
        _ => format!("Error while getting all {what} from url '{url}': {source}"),
    }
}
