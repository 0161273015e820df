//! Pest detection on inspection photos.

pub mod models;
pub mod routes;
pub mod services;

pub use routes::router;
pub use services::{PestDetector, VisionError};
