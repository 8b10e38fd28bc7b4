//! The response type passed through the enforcement pipeline.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

/// A handler or interceptor response, before it is turned into HTTP.
///
/// Interceptors inspect and replace responses, so they are kept as plain
/// data until the very end of the request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: StatusCode,
    body: Option<Value>,
}

impl ApiResponse {
    /// Creates a response without a body.
    pub fn new(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    /// `200 OK` with a JSON body.
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    /// `201 Created` with a JSON body.
    pub fn created(body: Value) -> Self {
        Self::new(StatusCode::CREATED).with_body(body)
    }

    /// `204 No Content`.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the JSON body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}
