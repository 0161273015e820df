//! Pricing route handlers.
//!
//! Every handler validates the body into a [`ServiceRequest`] first and runs
//! the calculation on the blocking pool.
//!
//! [`ServiceRequest`]: super::models::ServiceRequest

use axum::{extract::State, routing::post, Json, Router};

use crate::error::Result;
use crate::AppState;

use super::calculators::format_rupiah_with_cents;
use super::models::ServiceType;
use super::requests::CalculatePriceRequest;
use super::responses::{
    CalculatePriceResponse, ComparativePricesResponse, GprcQuoteResponse, QuoteResponse,
};
use super::services::{finite, run_blocking};

/// Create the pricing router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calculate-price", post(calculate_price))
        .route("/comparative-prices", post(comparative_prices))
        .route("/quote", post(quote))
        .route("/gprc-quote", post(gprc_quote))
}

/// POST /calculate-price
///
/// Raw result cell value, without service adjustment.
async fn calculate_price(
    State(state): State<AppState>,
    Json(body): Json<CalculatePriceRequest>,
) -> Result<Json<CalculatePriceResponse>> {
    let request = body.validate()?;
    let final_price = run_blocking(state.calculator.clone(), move |calc| {
        calc.calculated_price(&request)
    })
    .await?;

    Ok(Json(CalculatePriceResponse {
        success: true,
        final_price,
        formatted_final_price: format_rupiah_with_cents(finite(final_price)?),
    }))
}

/// POST /comparative-prices
async fn comparative_prices(
    State(state): State<AppState>,
    Json(body): Json<CalculatePriceRequest>,
) -> Result<Json<ComparativePricesResponse>> {
    let request = body.validate()?;
    let prices = run_blocking(state.calculator.clone(), move |calc| {
        calc.comparative_prices(&request)
    })
    .await?;

    Ok(Json(prices))
}

/// POST /quote
async fn quote(
    State(state): State<AppState>,
    Json(body): Json<CalculatePriceRequest>,
) -> Result<Json<QuoteResponse>> {
    let request = body.validate()?;
    let quote = run_blocking(state.calculator.clone(), move |calc| calc.quote(&request)).await?;

    Ok(Json(quote.into()))
}

/// POST /gprc-quote
async fn gprc_quote(
    State(state): State<AppState>,
    Json(body): Json<CalculatePriceRequest>,
) -> Result<Json<GprcQuoteResponse>> {
    let request = body.validate()?.with_service_type(ServiceType::GprcBundle);
    let quote = run_blocking(state.calculator.clone(), move |calc| calc.gprc_quote(&request)).await?;

    Ok(Json(quote.into()))
}
