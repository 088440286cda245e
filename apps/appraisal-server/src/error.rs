//! Error types for the appraisal server

use appraisal_core::AppraisalError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Analog slot not found: {0}")]
    SlotNotFound(u32),

    #[error("All analog slots are in use")]
    AnalogLimit,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Appraisal(#[from] AppraisalError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            ApiError::SlotNotFound(_) => (StatusCode::NOT_FOUND, "SLOT_NOT_FOUND"),
            ApiError::AnalogLimit => (StatusCode::CONFLICT, "ANALOG_LIMIT"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::Appraisal(err) => {
                let status = match err {
                    AppraisalError::NotSignedIn => StatusCode::UNAUTHORIZED,
                    AppraisalError::InvalidField { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code())
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
            "code": code,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
