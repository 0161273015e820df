//! Proposal route handlers

use axum::{extract::State, routing::post, Json, Router};

use crate::error::Result;
use crate::AppState;

use super::requests::GenerateProposalRequest;
use super::responses::ProposalResponse;
use super::services::{generate_proposal, ProposalError};

/// Create the proposal router
pub fn router() -> Router<AppState> {
    Router::new().route("/generate-propose", post(create_proposal))
}

/// POST /generate-propose
async fn create_proposal(
    State(state): State<AppState>,
    Json(body): Json<GenerateProposalRequest>,
) -> Result<Json<ProposalResponse>> {
    let input = body.validate().map_err(ProposalError::InvalidRequest)?;
    let proposal = generate_proposal(&state.db, state.calculator.clone(), input).await?;

    Ok(Json(proposal.into()))
}
