//! Client object to interact with a CA server.

use std::{fmt::Debug, sync::Arc};

use base64::{engine::general_purpose, Engine};
use fabric_sdk::{
    crypto::{CryptoSuite, CryptoSuiteFactory},
    identity::Enrollment,
    network_config::CaInfo,
    FabricSdkError,
};
use http::Method;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::form_urlencoded;

use crate::{
    config::{Config, DEFAULT_STATUS_CODE_THRESHOLD},
    error::RequestError,
    response::{classify, CaResponse},
    transport::{HttpRequest, HyperTransport, Transport},
    FabricCaClientError, Result,
};

/// Path every CA endpoint lives under.
pub const API_ROOT: &str = "/api/v1/";

/// Request body and query parameter that selects a CA on a multi-CA server.
pub(crate) const CA_NAME_PROPERTY: &str = "caname";

pub(crate) mod endpoints {
    pub const ENROLL: &str = "enroll";
    pub const REGISTER: &str = "register";
    pub const REENROLL: &str = "reenroll";
    pub const REVOKE: &str = "revoke";
    pub const INFO: &str = "cainfo";
    pub const GENCRL: &str = "gencrl";
    pub const IDENTITIES: &str = "identities";
    pub const AFFILIATIONS: &str = "affiliations";
}

/// How a request proves who sent it.
#[derive(Clone, Copy)]
pub(crate) enum Credentials<'a> {
    None,
    /// HTTP basic authentication with an enrollment id and secret.
    Basic { user: &'a str, secret: &'a str },
    /// Certificate plus a signature over body and certificate.
    Enrollment(&'a Enrollment),
}

/// A `FabricCaClient` talks to one certificate authority. It holds no
/// session: every operation is a single request/response exchange.
///
/// Each operation takes a [`CancellationToken`]; cancelling it abandons the
/// in-flight request with [`RequestError::Cancelled`].
#[derive(Debug, Clone)]
pub struct FabricCaClient {
    config: Config,
    crypto_suite: Arc<dyn CryptoSuite>,
    transport: Arc<dyn Transport>,
}

impl FabricCaClient {
    /// Create a client that talks HTTP(S) to the server in `config`.
    pub fn new(config: Config, crypto_suite: Arc<dyn CryptoSuite>) -> Self {
        let transport = Arc::new(HyperTransport::new(config.tls.clone()));
        Self::with_transport(config, crypto_suite, transport)
    }

    pub fn with_transport(
        config: Config,
        crypto_suite: Arc<dyn CryptoSuite>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            crypto_suite,
            transport,
        }
    }

    /// Create a client for a certificate authority from a network
    /// configuration, using the default suite of `factory`.
    pub fn from_ca_info(ca_info: &CaInfo, factory: &CryptoSuiteFactory) -> Result<Self> {
        let config = Config::from_ca_info(ca_info)?;
        let crypto_suite = factory.default_suite().map_err(FabricSdkError::from)?;
        Ok(Self::new(config, crypto_suite))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Name of the CA on a multi-CA server. `None` selects the default CA.
    pub fn ca_name(&self) -> Option<&str> {
        self.config.ca_name.as_deref()
    }

    pub fn crypto_suite(&self) -> &Arc<dyn CryptoSuite> {
        &self.crypto_suite
    }

    pub fn status_code_threshold(&self) -> u16 {
        self.config.status_code_threshold()
    }

    /// Values below 400 are raised to 400.
    pub fn set_status_code_threshold(&mut self, threshold: u16) {
        self.config.set_status_code_threshold(threshold);
    }

    /// Full url of `endpoint` with the CA name as `ca` query parameter.
    pub fn get_url(&self, endpoint: &str) -> String {
        self.add_ca_to_url(&self.endpoint_url(endpoint))
    }

    /// Like [`Self::get_url`] with additional query parameters.
    pub fn get_url_with_query(&self, endpoint: &str, query: &[(&str, &str)]) -> String {
        query
            .iter()
            .fold(self.get_url(endpoint), |url, (name, value)| {
                add_query_value(url, name, value)
            })
    }

    /// Append `ca=<name>` to `url` when the client has a CA name.
    pub fn add_ca_to_url(&self, url: &str) -> String {
        match self.ca_name() {
            Some(name) => add_query_value(url.to_string(), "ca", name),
            None => url.to_string(),
        }
    }

    pub(crate) fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{API_ROOT}{endpoint}", self.config.base_url())
    }

    /// Load trusted roots before the first request. Failures here are
    /// argument errors: the configuration cannot work.
    pub(crate) async fn set_up_tls(&self) -> Result<()> {
        self.transport
            .prepare()
            .await
            .map_err(|e| FabricCaClientError::InvalidArgument(e.to_string()))
    }

    /// `Authorization` header value proving `enrollment` sent `body`:
    /// `b64(cert) + "." + b64(sign(b64(body) + "." + b64(cert)))`.
    pub(crate) fn auth_header(
        &self,
        enrollment: &Enrollment,
        body: &str,
    ) -> std::result::Result<String, RequestError> {
        let certificate = general_purpose::STANDARD.encode(enrollment.certificate());
        let body = general_purpose::STANDARD.encode(body);
        let sign_string = format!("{body}.{certificate}");
        let signature = self
            .crypto_suite
            .sign(enrollment.key(), sign_string.as_bytes())?;

        Ok(format!(
            "{certificate}.{}",
            general_purpose::STANDARD.encode(signature)
        ))
    }

    pub(crate) async fn post(
        &self,
        url: String,
        body: String,
        credentials: Credentials<'_>,
        cancel: &CancellationToken,
    ) -> std::result::Result<CaResponse, RequestError> {
        self.exchange(Method::POST, url, body, credentials, cancel)
            .await
    }

    pub(crate) async fn get(
        &self,
        url: String,
        enrollment: &Enrollment,
        cancel: &CancellationToken,
    ) -> std::result::Result<CaResponse, RequestError> {
        self.exchange(
            Method::GET,
            url,
            String::new(),
            Credentials::Enrollment(enrollment),
            cancel,
        )
        .await
    }

    async fn exchange(
        &self,
        method: Method,
        url: String,
        body: String,
        credentials: Credentials<'_>,
        cancel: &CancellationToken,
    ) -> std::result::Result<CaResponse, RequestError> {
        // Only signed requests can be tolerated below the threshold.
        let (authorization, threshold) = match credentials {
            Credentials::None => (None, DEFAULT_STATUS_CODE_THRESHOLD),
            Credentials::Basic { user, secret } => {
                let token = general_purpose::STANDARD.encode(format!("{user}:{secret}"));
                (Some(format!("Basic {token}")), DEFAULT_STATUS_CODE_THRESHOLD)
            }
            Credentials::Enrollment(enrollment) => (
                Some(self.auth_header(enrollment, &body)?),
                self.status_code_threshold(),
            ),
        };

        debug!("Sending {} request to {}", method, url);
        let request = HttpRequest {
            method: method.clone(),
            url: url.clone(),
            body,
            authorization,
        };

        let response = self.send(request, cancel).await?;
        debug!("{} {} returned status {}", method, url, response.status);
        classify(&method, &url, response, threshold)
    }

    async fn send(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<crate::transport::HttpResponse, RequestError> {
        let in_flight = async {
            match self.config.request_timeout {
                Some(limit) => tokio::time::timeout(limit, self.transport.send(request))
                    .await
                    .map_err(|_| RequestError::Timeout(limit))?,
                None => self.transport.send(request).await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(RequestError::Cancelled),
            response = in_flight => response,
        }
    }
}

fn add_query_value(mut url: String, name: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    let value: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
    url.push(separator);
    url.push_str(name);
    url.push('=');
    url.push_str(&value);
    url
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transport::recording::RecordingTransport;
    use fabric_sdk::{crypto::OpenSslCryptoSuite, identity::User, test_utils::enrolled_user};
    use std::time::Duration;

    /// A client named `ca1` on `http://localhost:99` with a recording
    /// transport.
    pub(crate) fn test_client() -> (FabricCaClient, Arc<RecordingTransport>) {
        test_client_with(RecordingTransport::new())
    }

    pub(crate) fn test_client_with(
        transport: RecordingTransport,
    ) -> (FabricCaClient, Arc<RecordingTransport>) {
        let config = Config::new("http://localhost:99", Some("ca1".to_string())).unwrap();
        let transport = Arc::new(transport);
        let client = FabricCaClient::with_transport(
            config,
            Arc::new(OpenSslCryptoSuite::default()),
            transport.clone(),
        );
        (client, transport)
    }

    #[test]
    fn add_ca_to_url() {
        let (client, _) = test_client();
        assert_eq!(
            client.add_ca_to_url("http://localhost:99"),
            "http://localhost:99?ca=ca1"
        );
        assert_eq!(
            client.add_ca_to_url("http://localhost:99?x=1"),
            "http://localhost:99?x=1&ca=ca1"
        );
    }

    #[test]
    fn get_url_appends_endpoint_and_ca() {
        let (client, _) = test_client();
        assert_eq!(
            client.get_url("identities"),
            "http://localhost:99/api/v1/identities?ca=ca1"
        );
        assert_eq!(
            client.get_url_with_query("affiliations", &[("force", "true"), ("name", "a b")]),
            "http://localhost:99/api/v1/affiliations?ca=ca1&force=true&name=a+b"
        );
    }

    #[test]
    fn get_url_without_ca_name() {
        let config = Config::new("https://ca.example.com:7054", None).unwrap();
        let client = FabricCaClient::with_transport(
            config,
            Arc::new(OpenSslCryptoSuite::default()),
            Arc::new(RecordingTransport::new()),
        );
        assert_eq!(
            client.get_url("cainfo"),
            "https://ca.example.com:7054/api/v1/cainfo"
        );
    }

    #[test]
    fn auth_header_signs_body_and_certificate() {
        let (client, _) = test_client();
        let user = enrolled_user("admin", "Org1MSP");
        let enrollment = user.enrollment().unwrap();
        let body = r#"{"id":"user1"}"#;

        let header = client.auth_header(enrollment, body).unwrap();
        let (certificate, signature) = header.split_once('.').unwrap();

        assert_eq!(
            general_purpose::STANDARD.decode(certificate).unwrap(),
            enrollment.certificate().as_bytes()
        );
        let signed = format!("{}.{}", general_purpose::STANDARD.encode(body), certificate);
        let signature = general_purpose::STANDARD.decode(signature).unwrap();
        assert!(client
            .crypto_suite()
            .verify(enrollment.certificate(), &signature, signed.as_bytes())
            .unwrap());
    }

    #[tokio::test]
    async fn cancelled_request_is_abandoned() {
        let (client, transport) = test_client_with(RecordingTransport::never_responding());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client
            .post(
                client.endpoint_url(endpoints::INFO),
                "{}".to_string(),
                Credentials::None,
                &cancel,
            )
            .await;
        assert!(matches!(result, Err(RequestError::Cancelled)));
        assert!(transport.request_count() <= 1);
    }

    #[tokio::test]
    async fn slow_request_times_out() {
        let (mut client, _) = test_client_with(RecordingTransport::never_responding());
        client.config.request_timeout = Some(Duration::from_millis(10));

        let result = client
            .post(
                client.endpoint_url(endpoints::INFO),
                "{}".to_string(),
                Credentials::None,
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(RequestError::Timeout(_))));
    }

    #[tokio::test]
    async fn basic_credentials_are_sent() {
        let (client, transport) = test_client();
        transport.respond_success(serde_json::json!({}));

        let _ = client
            .post(
                client.endpoint_url(endpoints::ENROLL),
                "{}".to_string(),
                Credentials::Basic {
                    user: "admin",
                    secret: "adminpw",
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.url, "http://localhost:99/api/v1/enroll");
        assert_eq!(
            request.authorization.as_deref(),
            Some("Basic YWRtaW46YWRtaW5wdw==")
        );
    }

    #[test]
    fn threshold_can_be_raised_but_not_lowered() {
        let (mut client, _) = test_client();
        client.set_status_code_threshold(500);
        assert_eq!(client.status_code_threshold(), 500);
        client.set_status_code_threshold(0);
        assert_eq!(client.status_code_threshold(), 400);
    }
}
