//! Error handling for the application

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::pricing::PricingError;
use crate::proposal::ProposalError;
use crate::vision::VisionError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found")]
    NotFound,

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Pricing error: {0}")]
    Pricing(PricingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Vision error: {0}")]
    Vision(VisionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidRequest(messages) => AppError::Validation(messages),
            PricingError::Task(msg) => AppError::Internal(msg),
            other => AppError::Pricing(other),
        }
    }
}

impl From<ProposalError> for AppError {
    fn from(err: ProposalError) -> Self {
        match err {
            ProposalError::InvalidRequest(messages) => AppError::Validation(messages),
            ProposalError::Pricing(e) => e.into(),
            ProposalError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<VisionError> for AppError {
    fn from(err: VisionError) -> Self {
        if err.is_invalid_image() {
            AppError::Validation(vec![err.to_string()])
        } else {
            AppError::Vision(err)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Resource not found", json!(null)),
            AppError::Validation(messages) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation failed",
                json!(messages),
            ),
            AppError::Pricing(e) => {
                tracing::error!("Pricing error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Pricing calculation failed", json!(e.to_string()))
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error", json!(null))
            }
            AppError::Vision(e) => {
                tracing::error!("Vision error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Vision service unavailable", json!(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error", json!(null))
            }
        };

        (status, Json(json!({ "error": error, "details": details }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
