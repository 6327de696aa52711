//! Error types for the server

use crate::error::AutopriceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Pricing(#[from] AutopriceError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
            ServerError::Pricing(e @ (AutopriceError::ArtifactError(_) | AutopriceError::FileNotFound(_))) => {
                tracing::error!(detail = %e, "Reference data unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Pricing data is not available. Train a model first.".to_string(),
                )
            }
            ServerError::Pricing(e @ (AutopriceError::ValidationError(_) | AutopriceError::SchemaError(_))) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ServerError::Pricing(e) => {
                tracing::error!(detail = %e, "Pricing error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Could not produce an estimate".to_string())
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
