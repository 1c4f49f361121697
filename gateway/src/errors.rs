use crate::config::ValidationError;
use crate::params::ParamError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::http::make_json_error;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Errors that can occur while serving a gateway request
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Upstream timeout for {0}")]
    UpstreamTimeout(String),

    #[error("Upstream unavailable for {0}: {1}")]
    UpstreamUnavailable(String, String),

    #[error("Upstream returned status {status} for {url}")]
    UpstreamStatus { url: String, status: StatusCode },

    #[error("Malformed upstream response from {0}: {1}")]
    UpstreamMalformed(String, String),

    #[error("Invalid input: {0}")]
    InputInvalid(#[from] ParamError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamUnavailable(_, _) => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamStatus { status, .. } => *status,
            GatewayError::UpstreamMalformed(_, _) => StatusCode::BAD_GATEWAY,
            GatewayError::InputInvalid(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InvalidConfig(_) | GatewayError::Internal(_) | GatewayError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %self, "Request failed");
        }
        make_json_error(status, &self.to_string())
    }
}
