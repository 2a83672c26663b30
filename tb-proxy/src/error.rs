//! Error types for the HTTP API.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tb_bridge::ClientError;

use crate::api::ErrorResponse;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Bad request (unreadable body).
    BadRequest(String),
    /// Ledger client error.
    Client(ClientError),
}

impl AppError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Client(err) => match err {
                ClientError::Validation(_)
                | ClientError::EmptyBatch
                | ClientError::BatchTooLarge { .. } => StatusCode::BAD_REQUEST,
                ClientError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ClientError::Transport(_) | ClientError::Rejected(_) | ClientError::Protocol(_) => {
                    StatusCode::BAD_GATEWAY
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequest(msg) => msg,
            AppError::Client(err) => {
                if status.is_server_error() {
                    tracing::error!(error = %err, "ledger client error");
                } else {
                    tracing::debug!(error = %err, "rejected request");
                }
                err.to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        AppError::Client(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
