use fabric_sdk::identity::Enrollment;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    client::{endpoints, Credentials},
    error::RequestError,
    FabricCaClient,
};

/// Values for [`RegistrationRequest::identity_type`].
pub mod identity_types {
    pub const PEER: &str = "peer";
    pub const ORDERER: &str = "orderer";
    pub const CLIENT: &str = "client";
    pub const USER: &str = "user";
}

/// Attribute names the CA gives special meaning to.
pub mod attributes {
    pub const REGISTRAR_ROLES: &str = "hf.Registrar.Roles";
    pub const REGISTRAR_DELEGATE_ROLES: &str = "hf.Registrar.DelegateRoles";
    pub const REGISTRAR_ATTRIBUTES: &str = "hf.Registrar.Attributes";
    pub const INTERMEDIATE_CA: &str = "hf.IntermediateCA";
    pub const REVOKER: &str = "hf.Revoker";
    pub const AFFILIATION_MANAGER: &str = "hf.AffiliationMgr";
    pub const GEN_CRL: &str = "hf.GenCRL";
}

/// A name/value attribute attached to an identity. When `ecert` is set the
/// attribute is added to enrollment certificates by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub ecert: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ecert: false,
        }
    }

    pub fn in_ecert(mut self) -> Self {
        self.ecert = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub enrollment_id: String,
    /// One of [`identity_types`]; `client` by default.
    pub identity_type: String,
    /// Let the server pick a secret when `None`.
    pub secret: Option<String>,
    pub max_enrollments: Option<i32>,
    pub affiliation: Option<String>,
    pub attributes: Vec<Attribute>,
}

impl RegistrationRequest {
    pub fn new(enrollment_id: impl Into<String>) -> Self {
        Self {
            enrollment_id: enrollment_id.into(),
            identity_type: identity_types::CLIENT.to_string(),
            secret: None,
            max_enrollments: None,
            affiliation: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_identity_type(mut self, identity_type: impl Into<String>) -> Self {
        self.identity_type = identity_type.into();
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_max_enrollments(mut self, max_enrollments: i32) -> Self {
        self.max_enrollments = Some(max_enrollments);
        self
    }

    pub fn add_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

#[derive(Serialize)]
struct RegistrationBody<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    identity_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_enrollments: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    affiliation: Option<&'a str>,
    attrs: &'a [Attribute],
    #[serde(skip_serializing_if = "Option::is_none")]
    caname: Option<&'a str>,
}

impl FabricCaClient {
    pub(crate) async fn handle_register(
        &self,
        request: &RegistrationRequest,
        registrar: &Enrollment,
        cancel: &CancellationToken,
    ) -> Result<String, RequestError> {
        let body = RegistrationBody {
            id: &request.enrollment_id,
            identity_type: &request.identity_type,
            secret: request.secret.as_deref(),
            max_enrollments: request.max_enrollments,
            affiliation: request.affiliation.as_deref(),
            attrs: &request.attributes,
            caname: self.ca_name(),
        };
        let body = serde_json::to_string(&body)?;

        let response = self
            .post(
                self.endpoint_url(endpoints::REGISTER),
                body,
                Credentials::Enrollment(registrar),
                cancel,
            )
            .await?;

        response.string_field("secret")
    }
}
