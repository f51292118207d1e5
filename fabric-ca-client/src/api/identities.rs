use fabric_sdk::identity::Enrollment;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::Attribute;
use crate::{client::endpoints, error::RequestError, FabricCaClient};

/// An identity registered with the CA.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdentityInfo {
    #[serde(rename = "id")]
    pub enrollment_id: String,
    #[serde(rename = "type", default)]
    pub identity_type: String,
    #[serde(default)]
    pub affiliation: String,
    #[serde(rename = "attrs", default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub max_enrollments: i32,
}

#[derive(Deserialize)]
struct IdentitiesResult {
    #[serde(default)]
    identities: Vec<IdentityInfo>,
}

impl FabricCaClient {
    pub(crate) async fn handle_identities(
        &self,
        registrar: &Enrollment,
        cancel: &CancellationToken,
    ) -> Result<Vec<IdentityInfo>, RequestError> {
        let response = self
            .get(self.get_url(endpoints::IDENTITIES), registrar, cancel)
            .await?;

        // A tolerated failure lists nothing.
        if response.result.is_none() {
            return Ok(Vec::new());
        }
        let result: IdentitiesResult = response.parse()?;
        Ok(result.identities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{client::tests::test_client, FabricCaClientError};
    use fabric_sdk::test_utils::enrolled_user;
    use http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn identities_are_listed() {
        let (client, transport) = test_client();
        transport.respond_success(json!({
            "identities": [
                {
                    "id": "admin",
                    "type": "client",
                    "affiliation": "",
                    "attrs": [{ "name": "hf.Revoker", "value": "true" }],
                    "max_enrollments": -1,
                },
                { "id": "peer0", "type": "peer", "affiliation": "org1" },
            ],
            "caname": "ca1",
        }));
        let registrar = enrolled_user("admin", "Org1MSP");

        let identities = client
            .identities(&registrar, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(identities.len(), 2);
        assert_eq!(identities[0].enrollment_id, "admin");
        assert_eq!(identities[0].max_enrollments, -1);
        assert_eq!(identities[0].attributes[0], Attribute::new("hf.Revoker", "true"));
        assert_eq!(identities[1].identity_type, "peer");
        assert_eq!(identities[1].affiliation, "org1");

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "http://localhost:99/api/v1/identities?ca=ca1");
        assert!(request.body.is_empty());
        assert!(request.authorization.is_some());
    }

    #[tokio::test]
    async fn http_failure_carries_server_error() {
        let (client, transport) = test_client();
        transport.respond_error(500, 1, "internal");
        let registrar = enrolled_user("admin", "Org1MSP");

        let error = client
            .identities(&registrar, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, FabricCaClientError::Identity { .. }));
        let message = error.to_string();
        assert!(message.starts_with(
            "[HTTP Status Code: 500] - Error while getting all users from url 'http://localhost:99': "
        ));
        assert!(message.contains(r#""code":1"#));
        assert!(message.contains(r#""message":"internal""#));
    }
}
