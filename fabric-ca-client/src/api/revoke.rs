use fabric_sdk::identity::Enrollment;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    client::{endpoints, Credentials},
    error::RequestError,
    FabricCaClient,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevokeOptions {
    /// Reason as named in RFC 5280, e.g. `keyCompromise`.
    pub reason: Option<String>,
    /// Ask the server to return a fresh CRL with the response.
    pub gen_crl: bool,
}

impl RevokeOptions {
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_crl(mut self) -> Self {
        self.gen_crl = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokeResponse {
    pub status_code: u16,
    /// Present exactly when a CRL was requested.
    pub crl: Option<String>,
}

/// What a revocation applies to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Target<'a> {
    /// Every certificate of an identity.
    Identity(&'a str),
    /// One certificate.
    Certificate { serial: &'a str, aki: &'a str },
}

#[derive(Serialize)]
struct RevocationBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    serial: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aki: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    gencrl: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    caname: Option<&'a str>,
}

impl FabricCaClient {
    /// Serial number and authority key identifier of the enrollment
    /// certificate, both as hex.
    pub(crate) fn certificate_ids(
        &self,
        enrollment: &Enrollment,
    ) -> Result<(String, String), RequestError> {
        let info = self
            .crypto_suite()
            .certificate_info(enrollment.certificate())?;
        let aki = info
            .authority_key_identifier
            .ok_or(RequestError::MissingAuthorityKeyIdentifier)?;
        Ok((info.serial_number, aki))
    }

    pub(crate) async fn handle_revoke(
        &self,
        revoker: &Enrollment,
        target: Target<'_>,
        options: &RevokeOptions,
        cancel: &CancellationToken,
    ) -> Result<RevokeResponse, RequestError> {
        let (id, serial, aki) = match target {
            Target::Identity(id) => (Some(id), None, None),
            Target::Certificate { serial, aki } => (None, Some(serial), Some(aki)),
        };
        let body = RevocationBody {
            id,
            serial,
            aki,
            reason: options.reason.as_deref(),
            gencrl: options.gen_crl,
            caname: self.ca_name(),
        };
        let body = serde_json::to_string(&body)?;

        let response = self
            .post(
                self.endpoint_url(endpoints::REVOKE),
                body,
                Credentials::Enrollment(revoker),
                cancel,
            )
            .await?;
        debug!("Revoke returned status {}", response.status_code);

        let status_code = response.status_code;
        let crl = if options.gen_crl {
            let result = response.into_result()?;
            if result.is_empty() {
                return Err(RequestError::MissingField("result"));
            }
            match result.get("CRL").and_then(Value::as_str) {
                Some(crl) if !crl.is_empty() => Some(crl.to_string()),
                _ => return Err(RequestError::MissingField("CRL")),
            }
        } else {
            None
        };

        Ok(RevokeResponse { status_code, crl })
    }
}
