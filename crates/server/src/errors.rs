use axum::{http::StatusCode, response::IntoResponse, Json};
use padawan_core::domain::error::GatewayError;
use serde::Serialize;
use thiserror::Error;

use crate::models::{MessageEnvelope, SubmitMessage};

/// Startup failures. Anything after the
/// listener is up is reported per request.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("logging init error: {0}")]
    Logging(String),
    #[error("auth setup error: {0}")]
    Auth(String),
    #[error("bind error on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("http server error: {0}")]
    Serve(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct ServerError {
    status: StatusCode,
    code: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl ServerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let code = status_code_to_string(status);
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<GatewayError> for ServerError {
    fn from(err: GatewayError) -> Self {
        ServerError::new(gateway_status(&err), err.message())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Signup routes answer in the
/// `{message: {state, error}}` shape instead
/// of the error envelope.
#[derive(Debug)]
pub struct SubmitRejection {
    status: StatusCode,
    state: &'static str,
    error: String,
}

impl SubmitRejection {
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            state: "failure",
            error: error.into(),
        }
    }
}

impl From<GatewayError> for SubmitRejection {
    fn from(err: GatewayError) -> Self {
        let status = gateway_status(&err);
        let state = if status == StatusCode::SERVICE_UNAVAILABLE {
            "degraded"
        } else {
            "failure"
        };
        Self {
            status,
            state,
            error: err.message().to_string(),
        }
    }
}

impl IntoResponse for SubmitRejection {
    fn into_response(self) -> axum::response::Response {
        let body = MessageEnvelope {
            message: SubmitMessage {
                state: self.state,
                error: Some(self.error),
                ..SubmitMessage::default()
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn gateway_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
        GatewayError::Connectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Operation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn status_code_to_string(status: StatusCode) -> String {
    match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::SERVICE_UNAVAILABLE => "service_degraded",
        StatusCode::INTERNAL_SERVER_ERROR => "internal_error",
        _ => status.canonical_reason().unwrap_or("error"),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_map_to_statuses() {
        let cases = [
            (GatewayError::Validation("v".into()), StatusCode::BAD_REQUEST),
            (GatewayError::Connectivity("c".into()), StatusCode::SERVICE_UNAVAILABLE),
            (GatewayError::Operation("o".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }
}
