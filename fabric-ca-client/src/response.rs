//! The JSON envelope every CA response is wrapped in, and the rules for
//! turning it into a result or an error.

use http::Method;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{error::RequestError, transport::HttpResponse};

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    success: bool,
    result: Option<Value>,
    #[serde(default)]
    errors: Vec<ResponseMessage>,
    #[serde(default)]
    messages: Vec<ResponseMessage>,
}

/// A response that was not classified as a failure.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CaResponse {
    pub status_code: u16,
    /// `None` when the status was in the tolerated error band.
    pub result: Option<Map<String, Value>>,
}

impl CaResponse {
    /// The `result` object. Tolerated errors have none.
    pub fn into_result(self) -> Result<Map<String, Value>, RequestError> {
        self.result.ok_or(RequestError::MissingField("result"))
    }

    /// String field `name` of the result.
    pub fn string_field(&self, name: &'static str) -> Result<String, RequestError> {
        self.result
            .as_ref()
            .and_then(|result| result.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(RequestError::MissingField(name))
    }

    /// Deserialize the result object into `T`.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T, RequestError> {
        Ok(serde_json::from_value(Value::Object(self.into_result()?))?)
    }
}

/// Classify `response` to a `method` request against `url`.
///
/// * status at or above `threshold` is a failure.
/// * status in `[400, threshold)` is tolerated: the first error is logged and
///   only the status is returned.
/// * otherwise any reported error, `success: false` or a missing `result`
///   object is a failure.
pub(crate) fn classify(
    method: &Method,
    url: &str,
    response: HttpResponse,
    threshold: u16,
) -> Result<CaResponse, RequestError> {
    let status = response.status;
    if status >= threshold {
        return Err(RequestError::Http {
            status,
            message: format!("{method} request to {url} failed. Response: {}", response.body),
        });
    }
    if response.body.trim().is_empty() {
        return Err(RequestError::Http {
            status,
            message: format!("{method} request to {url} failed with empty response body returned."),
        });
    }

    let envelope: ResponseEnvelope = serde_json::from_str(&response.body)?;

    if (400..threshold).contains(&status) {
        if let Some(error) = envelope.errors.first() {
            warn!(
                "[HTTP Status Code: {}] - {} request to {} failed error message: [Error Code {}] - {}",
                status, method, url, error.code, error.message
            );
        }
        return Ok(CaResponse {
            status_code: status,
            result: None,
        });
    }

    if let Some(error) = envelope.errors.first() {
        return Err(RequestError::Http {
            status,
            message: format!(
                "{method} request to {url} failed error message: [Error Code {}] - {}",
                error.code, error.message
            ),
        });
    }
    if !envelope.success {
        return Err(RequestError::Http {
            status,
            message: format!(
                "{method} request to {url} failed. Body of response did not contain success"
            ),
        });
    }
    let result = match envelope.result {
        Some(Value::Object(result)) => result,
        _ => {
            return Err(RequestError::Http {
                status,
                message: format!(
                    "{method} request to {url} failed. Body of response did not contain result"
                ),
            })
        }
    };

    if let Some(message) = envelope.messages.first() {
        info!(
            "{} request to {} response message: [Code {}] - {}",
            method, url, message.code, message.message
        );
    }

    Ok(CaResponse {
        status_code: status,
        result: Some(result),
    })
}
