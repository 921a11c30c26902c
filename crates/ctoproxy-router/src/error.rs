use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use ctoproxy_protocol::openai::error::{ErrorBody, ErrorDetail, INVALID_REQUEST_ERROR, SERVER_ERROR};
use ctoproxy_provider_core::ClientError;

/// An error answered with the OpenAI error envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl GatewayError {
    pub fn new(
        status: StatusCode,
        kind: &str,
        message: impl Into<String>,
        param: Option<&str>,
        code: Option<&str>,
    ) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: ErrorDetail {
                    message: message.into(),
                    kind: kind.to_string(),
                    param: param.map(str::to_string),
                    code: code.map(str::to_string),
                },
            },
        }
    }

    pub fn invalid_request(message: impl Into<String>, param: Option<&str>, code: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            INVALID_REQUEST_ERROR,
            message,
            param,
            Some(code),
        )
    }

    pub fn not_found(method: &str, path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            INVALID_REQUEST_ERROR,
            format!("Unknown route: {method} {path}"),
            None,
            Some("not_found"),
        )
    }

    pub fn code(&self) -> Option<&str> {
        self.body.error.code.as_deref()
    }
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::PoolEmpty => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                SERVER_ERROR,
                "No upstream credentials are available.",
                None,
                Some("no_credentials"),
            ),
            ClientError::Auth(_) | ClientError::Api(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                SERVER_ERROR,
                format!("Upstream service error: {err}"),
                None,
                Some("upstream_error"),
            ),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
