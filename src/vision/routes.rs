//! Pest detection route handlers.
//!
//! The image arrives as the `image` field of a multipart form. Failures of
//! the vision service degrade to a fixed description instead of failing the
//! request.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::warn;

use crate::error::{AppError, Result};
use crate::AppState;

use super::models::Detection;
use super::services::{VisionError, DEGRADED_DESCRIPTION};

const IMAGE_FIELD: &str = "image";

/// Create the vision router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/detect-pest", post(detect_pest))
        .route("/locate-pest", post(locate_pest))
}

fn invalid_upload(err: impl std::fmt::Display) -> AppError {
    AppError::Validation(vec![format!("image upload is invalid: {}", err)])
}

/// Bytes of the `image` form field.
async fn image_field(
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Bytes> {
    let mut multipart = multipart.map_err(invalid_upload)?;
    while let Some(field) = multipart.next_field().await.map_err(invalid_upload)? {
        if field.name() == Some(IMAGE_FIELD) {
            return field.bytes().await.map_err(invalid_upload);
        }
    }
    Err(AppError::Validation(vec!["image is required".to_string()]))
}

fn degraded(err: &VisionError) -> Json<Detection> {
    warn!(error = %err, "Vision analysis degraded");
    Json(Detection {
        description: DEGRADED_DESCRIPTION.to_string(),
        degraded: true,
    })
}

/// POST /detect-pest
async fn detect_pest(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Detection>> {
    let image = image_field(multipart).await?;
    match state.detector.detect(&image).await {
        Ok(detection) => Ok(Json(detection)),
        Err(e) if e.is_upstream() => Ok(degraded(&e)),
        Err(e) => Err(e.into()),
    }
}

/// POST /locate-pest
async fn locate_pest(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let image = image_field(multipart).await?;
    match state.detector.locate(&image).await {
        Ok(located) => Ok(Json(located).into_response()),
        Err(e) if e.is_upstream() => Ok(degraded(&e).into_response()),
        Err(e) => Err(e.into()),
    }
}
