use fabric_sdk::identity::Enrollment;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::IdentityInfo;
use crate::{client::endpoints, error::RequestError, FabricCaClient};

/// A node of the affiliation tree with the identities directly under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AffiliationInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub affiliations: Vec<AffiliationInfo>,
    #[serde(default)]
    pub identities: Vec<IdentityInfo>,
}

impl AffiliationInfo {
    /// Depth-first names of this node's descendants.
    pub fn descendant_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for child in &self.affiliations {
            names.push(child.name.as_str());
            names.extend(child.descendant_names());
        }
        names
    }
}

impl FabricCaClient {
    pub(crate) async fn handle_affiliations(
        &self,
        registrar: &Enrollment,
        cancel: &CancellationToken,
    ) -> Result<AffiliationInfo, RequestError> {
        let response = self
            .get(self.get_url(endpoints::AFFILIATIONS), registrar, cancel)
            .await?;

        if response.result.is_none() {
            return Ok(AffiliationInfo::default());
        }
        response.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{client::tests::test_client, FabricCaClientError};
    use fabric_sdk::test_utils::enrolled_user;
    use serde_json::json;

    #[tokio::test]
    async fn affiliation_tree_is_parsed() {
        let (client, transport) = test_client();
        transport.respond_success(json!({
            "name": "",
            "affiliations": [
                {
                    "name": "org1",
                    "affiliations": [
                        { "name": "org1.department1" },
                        { "name": "org1.department2" },
                    ],
                },
                { "name": "org2" },
            ],
            "caname": "ca1",
        }));
        let registrar = enrolled_user("admin", "Org1MSP");

        let tree = client
            .affiliations(&registrar, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            tree.descendant_names(),
            vec!["org1", "org1.department1", "org1.department2", "org2"]
        );
        assert_eq!(
            transport.requests()[0].url,
            "http://localhost:99/api/v1/affiliations?ca=ca1"
        );
    }

    #[tokio::test]
    async fn tolerated_failure_is_an_empty_tree() {
        let (mut client, transport) = test_client();
        client.set_status_code_threshold(500);
        transport.respond_error(403, 71, "Authorization failure");
        let registrar = enrolled_user("admin", "Org1MSP");

        let tree = client
            .affiliations(&registrar, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(tree, AffiliationInfo::default());
    }

    #[tokio::test]
    async fn transport_failure_is_an_affiliation_error() {
        let (client, _) = test_client();
        let registrar = enrolled_user("admin", "Org1MSP");

        // Nothing queued: the recording transport fails the request.
        let error = client
            .affiliations(&registrar, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, FabricCaClientError::Affiliation { .. }));
        assert!(error
            .to_string()
            .starts_with("Error while getting all affiliations from url"));
    }
}
