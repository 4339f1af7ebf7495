//! HTTP handlers for the server.

pub mod labels;
pub mod print;
pub mod transports;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::EtiquetaError;

/// Error body: `{"success": false, "code": "...", "error": "..."}`.
pub struct ApiError(pub EtiquetaError);

impl From<EtiquetaError> for ApiError {
    fn from(e: EtiquetaError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EtiquetaError::InvalidPayload(_)
            | EtiquetaError::InvalidQuantity(_)
            | EtiquetaError::MalformedDocument(_)
            | EtiquetaError::DangerousCommandBlocked(_)
            | EtiquetaError::Template(_)
            | EtiquetaError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EtiquetaError::Connection(_)
            | EtiquetaError::Send(_)
            | EtiquetaError::InterpreterProtocol(_)
            | EtiquetaError::Delivery(_) => StatusCode::BAD_GATEWAY,
            EtiquetaError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "success": false,
            "code": self.0.code(),
            "error": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
