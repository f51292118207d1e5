//! HTTP exchange with the CA server.
//!
//! The client only needs "send one request, get status and body back", so the
//! wire is hidden behind the [`Transport`] trait. [`HyperTransport`] is the
//! real implementation.

#[cfg(test)]
pub(crate) mod recording;

use std::fmt::Debug;

use async_trait::async_trait;
use fabric_sdk::infrastructure::pem_utils;
use http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Method, Request,
};
use hyper::{client::HttpConnector, Body};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, RootCertStore};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::{config::TlsSettings, error::RequestError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: String,
    /// Value of the `Authorization` header, if any.
    pub authorization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Make sure the transport can be used, e.g. load trusted certificates.
    /// Called before every operation; must be cheap after the first call.
    async fn prepare(&self) -> Result<(), RequestError> {
        Ok(())
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError>;
}

type HyperClient = hyper::Client<HttpsConnector<HttpConnector>, Body>;

/// [`Transport`] over `hyper` with `rustls`.
///
/// The trust store is built from [`TlsSettings`] on first use and kept for
/// the lifetime of the transport.
#[derive(Debug)]
pub struct HyperTransport {
    tls: TlsSettings,
    client: OnceCell<HyperClient>,
}

impl HyperTransport {
    pub fn new(tls: TlsSettings) -> Self {
        Self {
            tls,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&HyperClient, RequestError> {
        self.client
            .get_or_try_init(|| async { self.connect() })
            .await
    }

    fn connect(&self) -> Result<HyperClient, RequestError> {
        let tls_config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(self.root_store()?)
            .with_no_client_auth();

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        Ok(hyper::Client::builder().build(connector))
    }

    fn root_store(&self) -> Result<RootCertStore, RequestError> {
        if self.tls.pem.is_none() && self.tls.pem_files.is_empty() {
            warn!("TLS with no CA certificates in either pem bytes or pem files");
        }
        if self.tls.allow_all_host_names {
            warn!("Host name verification cannot be disabled; server names are still checked");
        }

        let mut root_store = RootCertStore::empty();
        let mut add = |certificates: Vec<rustls::Certificate>| -> Result<(), RequestError> {
            for certificate in certificates {
                root_store
                    .add(&certificate)
                    .map_err(|e| RequestError::Transport(format!("Invalid CA certificate: {e}")))?;
            }
            Ok(())
        };

        if let Some(pem) = &self.tls.pem {
            let certificates = pem_utils::read_certificates_from_bytes(pem.as_bytes())
                .map_err(|e| RequestError::Transport(e.to_string()))?;
            add(certificates)?;
        }
        for pem_file in &self.tls.pem_files {
            let certificates = pem_utils::read_certificates(pem_file).map_err(|_| {
                RequestError::Transport(format!(
                    "Unable to add CA certificate, can't open certificate file {}",
                    pem_file.display()
                ))
            })?;
            add(certificates)?;
        }

        debug!("Trust store holds {} CA certificates", root_store.len());
        Ok(root_store)
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn prepare(&self) -> Result<(), RequestError> {
        let _ = self.client().await?;
        Ok(())
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        let client = self.client().await?;

        let mut builder = Request::builder()
            .method(request.method)
            .uri(request.url.as_str());
        if !request.body.is_empty() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        if let Some(authorization) = &request.authorization {
            builder = builder.header(AUTHORIZATION, authorization.as_str());
        }
        let http_request = builder.body(Body::from(request.body))?;

        let response = client.request(http_request).await?;
        let status = response.status().as_u16();
        let body = hyper::body::to_bytes(response.into_body()).await?;

        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}
