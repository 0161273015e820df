//! Pest-control pricing and proposal service.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, http::Method, routing::get, Json, Router};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod pricing;
pub mod proposal;
pub mod vision;
pub mod workbook;

use error::AppError;
use pricing::PriceCalculator;
use vision::PestDetector;

/// Room for a 5 MiB image plus request overhead.
const BODY_LIMIT: usize = 6 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub calculator: Arc<PriceCalculator>,
    pub detector: Arc<PestDetector>,
}

fn api() -> Router<AppState> {
    Router::new()
        .merge(pricing::router())
        .merge(proposal::router())
        .merge(vision::router())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api())
        .nest("/api", api())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
