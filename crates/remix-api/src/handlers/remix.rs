//! Remix submission and effect listing handlers.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use tracing::info;

use remix_models::{
    format_file_size, format_processing_time, EffectSummary, RemixRequest, RemixResponse,
};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Effect listing.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectsResponse {
    pub effects: Vec<EffectSummary>,
    pub default_effect: String,
}

/// List the effect catalog.
pub async fn list_effects(State(state): State<AppState>) -> Json<EffectsResponse> {
    let catalog = state.orchestrator.catalog();
    Json(EffectsResponse {
        effects: catalog.summaries(),
        default_effect: catalog.default_id().to_string(),
    })
}

/// Download, remix and publish one audio file.
pub async fn create_remix(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RemixRequest>, JsonRejection>,
) -> ApiResult<Json<RemixResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::MalformedBody(rejection.body_text())
        }
    })?;

    let start = Instant::now();
    let outcome = state
        .orchestrator
        .process(request)
        .await
        .map_err(|e| {
            if e.is_client_error() {
                ApiError::from(e)
            } else {
                ApiError::job(e, start.elapsed())
            }
        })?;

    let download_url = format!(
        "{}/outputs/{}",
        public_base_url(&state.config, &headers),
        outcome.file_name
    );
    let retention_minutes = state.pipeline().retention.as_secs() / 60;

    info!(
        job_id = %outcome.job_id,
        effect = %outcome.effect,
        file_size = outcome.file_size,
        "Remix published"
    );

    Ok(Json(RemixResponse {
        success: true,
        message: format!(
            "Applied the {} effect. Download within {} minutes.",
            outcome.effect, retention_minutes
        ),
        effect: outcome.effect,
        download_url,
        processing_time: format_processing_time(outcome.elapsed),
        file_size: format_file_size(outcome.file_size),
    }))
}

/// Origin clients should use to reach published files.
///
/// Falls back to the request's `Host` (and `X-Forwarded-Proto`) and finally
/// to a root-relative link.
fn public_base_url(config: &ApiConfig, headers: &HeaderMap) -> String {
    if let Some(base) = &config.public_base_url {
        return base.clone();
    }

    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|h| !h.is_empty());

    match host {
        Some(host) => {
            let proto = headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|p| *p == "http" || *p == "https")
                .unwrap_or("http");
            format!("{}://{}", proto, host)
        }
        None => String::new(),
    }
}
