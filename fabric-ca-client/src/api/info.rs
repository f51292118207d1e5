use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::{
    client::{endpoints, Credentials, CA_NAME_PROPERTY},
    error::RequestError,
    FabricCaClient,
};

/// What a CA server says about itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CaInfoResponse {
    #[serde(rename = "CAName")]
    pub ca_name: String,
    /// Base64 encoded PEM chain of the CA certificates.
    #[serde(rename = "CAChain")]
    pub ca_chain: String,
    #[serde(rename = "Version", default)]
    pub version: Option<String>,
    /// Idemix issuer public key, if the server supports idemix.
    #[serde(rename = "IssuerPublicKey", default)]
    pub issuer_public_key: Option<String>,
    #[serde(rename = "IssuerRevocationPublicKey", default)]
    pub issuer_revocation_public_key: Option<String>,
}

impl FabricCaClient {
    pub(crate) async fn handle_info(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CaInfoResponse, RequestError> {
        let mut body = Map::new();
        if let Some(ca_name) = self.ca_name() {
            let _ = body.insert(
                CA_NAME_PROPERTY.to_string(),
                Value::String(ca_name.to_string()),
            );
        }

        let response = self
            .post(
                self.endpoint_url(endpoints::INFO),
                Value::Object(body).to_string(),
                Credentials::None,
                cancel,
            )
            .await?;

        response.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{client::tests::test_client, FabricCaClientError};
    use serde_json::json;

    #[tokio::test]
    async fn info_is_unauthenticated() {
        let (client, transport) = test_client();
        transport.respond_success(json!({
            "CAName": "ca1",
            "CAChain": "LS0tLS1CRUdJTg==",
            "Version": "1.4.9",
            "IssuerPublicKey": "aXB1Yg==",
        }));

        let info = client.info(&CancellationToken::new()).await.unwrap();
        assert_eq!(
            info,
            CaInfoResponse {
                ca_name: "ca1".to_string(),
                ca_chain: "LS0tLS1CRUdJTg==".to_string(),
                version: Some("1.4.9".to_string()),
                issuer_public_key: Some("aXB1Yg==".to_string()),
                issuer_revocation_public_key: None,
            }
        );

        let request = &transport.requests()[0];
        assert!(request.authorization.is_none());
        assert_eq!(request.url, "http://localhost:99/api/v1/cainfo");
        assert_eq!(transport.single_body(), json!({ "caname": "ca1" }));
    }

    #[tokio::test]
    async fn failed_info_is_an_info_error() {
        let (client, transport) = test_client();
        transport.respond(500, "");

        let error = client.info(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(error, FabricCaClientError::Info { .. }));
        assert_eq!(error.status_code(), Some(500));
    }
}
