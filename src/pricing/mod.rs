//! Pricing engine for pest-control services.
//!
//! Requests are written into a fresh calculation surface, the result cell is
//! read back and then adjusted per service type. Also provides the soil
//! chemical comparison and the GPRC bundle.

pub mod calculators;
pub mod catalog;
pub mod models;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;
pub mod sheet;

// Re-export commonly used items
pub use calculators::round_money;
pub use routes::router;
pub use services::{PriceCalculator, PricingError};
