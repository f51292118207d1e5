//! In-process [`Transport`] that records requests and replays canned
//! responses.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{HttpRequest, HttpResponse, Transport};
use crate::error::RequestError;

#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<HttpResponse>>,
    never_respond: bool,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A transport whose requests never complete.
    pub(crate) fn never_responding() -> Self {
        Self {
            never_respond: true,
            ..Self::default()
        }
    }

    /// Queue a raw response.
    pub(crate) fn respond(&self, status: u16, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(HttpResponse {
                status,
                body: body.into(),
            });
    }

    /// Queue a successful envelope around `result`.
    pub(crate) fn respond_success(&self, result: Value) {
        let body = json!({
            "success": true,
            "result": result,
            "errors": [],
            "messages": [],
        });
        self.respond(200, body.to_string());
    }

    /// Queue an error envelope with a single error.
    pub(crate) fn respond_error(&self, status: u16, code: i64, message: &str) {
        let body = json!({
            "success": false,
            "result": null,
            "errors": [{ "code": code, "message": message }],
            "messages": [],
        });
        self.respond(status, body.to_string());
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The JSON body of the only recorded request.
    pub(crate) fn single_body(&self) -> Value {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        serde_json::from_str(&requests[0].body).unwrap()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if self.never_respond {
            std::future::pending::<()>().await;
        }

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| RequestError::Transport("no response queued".to_string()))
    }
}
