//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::handlers::{create_remix, health, list_effects, ready, root};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RemixRateLimiter,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let rate_limiter = RemixRateLimiter::new(state.config.rate_limit_rps);

    // Only submissions are rate-limited
    let remix_routes = Router::new()
        .route("/remix", post(create_remix))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let info_routes = Router::new()
        .route("/", get(root))
        .route("/effects", get(list_effects))
        .route("/presets", get(list_effects))
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Publish boundary: read-only, 404 once a file is removed
    let outputs = ServeDir::new(&state.pipeline().output_dir);

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(remix_routes)
        .merge(info_routes)
        .merge(metrics_routes)
        .nest_service("/outputs", outputs)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
