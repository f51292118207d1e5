use base64::{engine::general_purpose, Engine};
use fabric_sdk::{crypto::PrivateKey, identity::Enrollment};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    client::{endpoints, Credentials},
    error::RequestError,
    response::CaResponse,
    FabricCaClient,
};

/// Request an attribute to be put into the enrollment certificate. A
/// non-optional attribute the identity lacks fails the enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRequest {
    pub name: String,
    #[serde(default)]
    pub optional: bool,
}

/// Options for enroll and reenroll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentRequest {
    /// Subject alternative names for the certificate.
    pub hosts: Vec<String>,
    /// Signing profile on the server.
    pub profile: Option<String>,
    /// HSM label on the server.
    pub label: Option<String>,
    /// PEM certificate signing request. Requires [`Self::key`].
    pub csr: Option<String>,
    /// Key pair to certify instead of a fresh (enroll) or the current
    /// (reenroll) one.
    pub key: Option<PrivateKey>,
    pub attribute_requests: Vec<AttributeRequest>,
}

impl EnrollmentRequest {
    pub fn with_hosts(mut self, hosts: Vec<String>) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Certify `key` using the given `csr` for it.
    pub fn with_key_and_csr(mut self, key: PrivateKey, csr: impl Into<String>) -> Self {
        self.key = Some(key);
        self.csr = Some(csr.into());
        self
    }

    /// Certify `key`; the signing request is generated for it.
    pub fn with_key(mut self, key: PrivateKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn add_attribute_request(mut self, name: impl Into<String>, optional: bool) -> Self {
        self.attribute_requests.push(AttributeRequest {
            name: name.into(),
            optional,
        });
        self
    }

    pub(crate) fn to_json(
        &self,
        certificate_request: &str,
        ca_name: Option<&str>,
    ) -> Result<String, RequestError> {
        let body = EnrollmentBody {
            hosts: (!self.hosts.is_empty()).then_some(self.hosts.as_slice()),
            profile: self.profile.as_deref(),
            label: self.label.as_deref(),
            certificate_request,
            attr_reqs: (!self.attribute_requests.is_empty())
                .then_some(self.attribute_requests.as_slice()),
            caname: ca_name,
        };
        Ok(serde_json::to_string(&body)?)
    }
}

#[derive(Serialize)]
struct EnrollmentBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    hosts: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    certificate_request: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attr_reqs: Option<&'a [AttributeRequest]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caname: Option<&'a str>,
}

/// The PEM certificate carried base64 encoded in the `Cert` result field.
pub(crate) fn decode_certificate(response: &CaResponse) -> Result<String, RequestError> {
    let encoded = response.string_field("Cert")?;
    let decoded = general_purpose::STANDARD.decode(encoded)?;
    String::from_utf8(decoded).map_err(|_| RequestError::NotUtf8)
}

impl FabricCaClient {
    pub(crate) async fn handle_enroll(
        &self,
        user: &str,
        secret: &str,
        request: EnrollmentRequest,
        cancel: &CancellationToken,
    ) -> Result<Enrollment, RequestError> {
        let key = match &request.key {
            Some(key) => key.clone(),
            None => {
                debug!("Generating key pair for {}", user);
                self.crypto_suite().key_gen()?
            }
        };
        let csr = match &request.csr {
            Some(csr) => csr.clone(),
            None => self
                .crypto_suite()
                .generate_certification_request(user, &key)?,
        };
        let body = request.to_json(&csr, self.ca_name())?;

        let response = self
            .post(
                self.endpoint_url(endpoints::ENROLL),
                body,
                Credentials::Basic { user, secret },
                cancel,
            )
            .await?;

        let certificate = decode_certificate(&response)?;
        debug!("Enrollment of {} returned a certificate", user);
        Ok(Enrollment::new(key, certificate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{client::tests::test_client, FabricCaClientError};
    use fabric_sdk::{crypto::CryptoSuite, test_utils::self_signed_certificate};
    use serde_json::json;

    fn issued(certificate: &str) -> serde_json::Value {
        json!({
            "Cert": general_purpose::STANDARD.encode(certificate),
            "ServerInfo": { "CAName": "ca1", "CAChain": "" },
        })
    }

    #[tokio::test]
    async fn argument_errors_send_nothing() {
        let (client, transport) = test_client();
        let cancel = CancellationToken::new();

        let cases = [
            ("", "secret", EnrollmentRequest::default(), "enrollment user is not set"),
            ("admin", "", EnrollmentRequest::default(), "enrollment secret is not set"),
            (
                "admin",
                "secret",
                EnrollmentRequest {
                    csr: Some("CSR".to_string()),
                    ..Default::default()
                },
                "key pair needs to be supplied",
            ),
        ];

        for (user, secret, request, expected) in cases {
            match client.enroll(user, secret, request, &cancel).await {
                Err(FabricCaClientError::InvalidArgument(message)) => {
                    assert!(message.contains(expected), "{message}")
                }
                other => panic!("unexpected result {other:?}"),
            }
        }
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn enroll_generates_key_and_csr() {
        let (client, transport) = test_client();
        let (_, certificate) = self_signed_certificate("admin", true);
        transport.respond_success(issued(&certificate));

        let request = EnrollmentRequest::default()
            .with_hosts(vec!["host1".to_string()])
            .with_profile("tls")
            .add_attribute_request("app.role", true);
        let enrollment = client
            .enroll("admin", "adminpw", request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(enrollment.certificate(), certificate);
        assert!(enrollment.key().as_pem().contains("PRIVATE KEY"));

        let body = transport.single_body();
        assert_eq!(body["hosts"], json!(["host1"]));
        assert_eq!(body["profile"], "tls");
        assert_eq!(body["caname"], "ca1");
        assert_eq!(body["attr_reqs"], json!([{ "name": "app.role", "optional": true }]));
        assert!(body.get("label").is_none());
        assert!(body["certificate_request"]
            .as_str()
            .unwrap()
            .starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
        assert!(!transport.requests()[0].body.contains("PRIVATE KEY"));

        let authorization = transport.requests()[0].authorization.clone().unwrap();
        assert!(authorization.starts_with("Basic "));
    }

    #[tokio::test]
    async fn enroll_uses_supplied_key() {
        let (client, transport) = test_client();
        let (_, certificate) = self_signed_certificate("admin", true);
        transport.respond_success(issued(&certificate));

        let key = client.crypto_suite().key_gen().unwrap();
        let csr = client
            .crypto_suite()
            .generate_certification_request("admin", &key)
            .unwrap();

        let enrollment = client
            .enroll(
                "admin",
                "adminpw",
                EnrollmentRequest::default().with_key_and_csr(key.clone(), csr.clone()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(enrollment.key(), &key);
        assert_eq!(transport.single_body()["certificate_request"], csr);
    }

    #[tokio::test]
    async fn rejected_enrollment_is_an_enrollment_error() {
        let (client, transport) = test_client();
        transport.respond_error(401, 20, "Authentication failure");

        let error = client
            .enroll(
                "admin",
                "wrong",
                EnrollmentRequest::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, FabricCaClientError::Enrollment { .. }));
        assert!(error.to_string().contains("Failed to enroll user admin"));
        assert_eq!(error.status_code(), Some(401));
    }

    #[tokio::test]
    async fn missing_certificate_is_an_enrollment_error() {
        let (client, transport) = test_client();
        transport.respond_success(json!({}));

        let error = client
            .enroll(
                "admin",
                "adminpw",
                EnrollmentRequest::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            error.request_error(),
            Some(RequestError::MissingField("Cert"))
        ));
    }
}
