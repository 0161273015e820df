//! Multi-service proposals.
//!
//! Prices the selected services, chooses the document template, numbers the
//! proposal and prepares the placeholder values the document adapter fills
//! in.

pub mod models;
pub mod queries;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;

pub use routes::router;
pub use services::{generate_proposal, ProposalError};
