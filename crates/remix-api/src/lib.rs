//! Axum HTTP API for the audio remix service.
//!
//! This crate provides:
//! - Remix submission and effect listing
//! - Time-limited static serving of published files
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod system;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
