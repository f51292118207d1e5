use fabric_sdk::identity::Enrollment;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{enroll::decode_certificate, EnrollmentRequest};
use crate::{
    client::{endpoints, Credentials},
    error::RequestError,
    FabricCaClient,
};

impl FabricCaClient {
    pub(crate) async fn handle_reenroll(
        &self,
        user: &str,
        current: &Enrollment,
        request: EnrollmentRequest,
        cancel: &CancellationToken,
    ) -> Result<Enrollment, RequestError> {
        let key = request
            .key
            .clone()
            .unwrap_or_else(|| current.key().clone());
        let csr = match &request.csr {
            Some(csr) => csr.clone(),
            None => self
                .crypto_suite()
                .generate_certification_request(user, &key)?,
        };
        let body = request.to_json(&csr, self.ca_name())?;

        let response = self
            .post(
                self.endpoint_url(endpoints::REENROLL),
                body,
                Credentials::Enrollment(current),
                cancel,
            )
            .await?;

        let certificate = decode_certificate(&response)?;
        debug!("Reenrollment of {} returned a certificate", user);
        Ok(Enrollment::new(key, certificate))
    }
}
