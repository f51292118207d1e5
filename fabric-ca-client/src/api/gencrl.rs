use fabric_sdk::identity::Enrollment;
use serde_json::{Map, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio_util::sync::CancellationToken;

use crate::{
    client::{endpoints, Credentials, CA_NAME_PROPERTY},
    error::RequestError,
    FabricCaClient,
};

/// Filters for the certificates listed in a generated CRL. Each one is
/// optional and they combine freely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateCrlRequest {
    pub revoked_before: Option<OffsetDateTime>,
    pub revoked_after: Option<OffsetDateTime>,
    pub expire_before: Option<OffsetDateTime>,
    pub expire_after: Option<OffsetDateTime>,
}

impl GenerateCrlRequest {
    fn to_json(self, ca_name: Option<&str>) -> Result<String, RequestError> {
        let mut body = Map::new();
        for (name, value) in [
            ("revokedBefore", self.revoked_before),
            ("revokedAfter", self.revoked_after),
            ("expireBefore", self.expire_before),
            ("expireAfter", self.expire_after),
        ] {
            if let Some(value) = value {
                let _ = body.insert(name.to_string(), Value::String(value.format(&Rfc3339)?));
            }
        }
        if let Some(ca_name) = ca_name {
            let _ = body.insert(
                CA_NAME_PROPERTY.to_string(),
                Value::String(ca_name.to_string()),
            );
        }
        Ok(Value::Object(body).to_string())
    }
}

impl FabricCaClient {
    pub(crate) async fn handle_generate_crl(
        &self,
        registrar: &Enrollment,
        request: &GenerateCrlRequest,
        cancel: &CancellationToken,
    ) -> Result<String, RequestError> {
        let body = request.to_json(self.ca_name())?;

        let response = self
            .post(
                self.endpoint_url(endpoints::GENCRL),
                body,
                Credentials::Enrollment(registrar),
                cancel,
            )
            .await?;

        response.string_field("CRL")
    }
}
