//! Error type for the HTTP surface and its status-code mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use board::BoardError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Missing X-GitHub-Event header")]
    MissingEventType,

    #[error("Missing X-Hub-Signature-256 header")]
    MissingSignature,

    #[error("Webhook signature does not match the payload")]
    InvalidSignature,

    #[error("Invalid {event} payload: {message}")]
    InvalidPayload { event: String, message: String },

    #[error("Report generation failed: {0}")]
    Report(#[from] BoardError),
}

impl ListenerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingEventType | Self::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            Self::MissingSignature | Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::Report(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ListenerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
