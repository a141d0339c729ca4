//! Service metadata and health check handlers.

use std::path::Path;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use remix_media::check_ffmpeg;
use remix_models::{EffectSummary, RemixRequest};

use crate::state::AppState;
use crate::system::MemorySnapshot;

/// Service metadata returned at `/`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub status: String,
    pub message: String,
    pub version: String,
    pub memory: MemorySnapshot,
    pub effects: Vec<EffectSummary>,
    pub default_effect: String,
    pub example: RemixRequest,
    pub endpoints: Vec<&'static str>,
}

/// Service metadata endpoint.
pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    let catalog = state.orchestrator.catalog();
    Json(ServiceInfo {
        status: "online".to_string(),
        message: "Audio remix API: download, apply an effect, fetch the result".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        memory: state.system.memory().await,
        effects: catalog.summaries(),
        default_effect: catalog.default_id().to_string(),
        example: RemixRequest::example(),
        endpoints: vec![
            "POST /remix",
            "GET /effects",
            "GET /outputs/{filename}",
            "GET /health",
            "GET /ready",
        ],
    })
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Seconds since startup
    pub uptime: u64,
    pub memory: MemorySnapshot,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime: state.started_at.elapsed().as_secs(),
        memory: state.system.memory().await,
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub staging_dir: CheckStatus,
    pub output_dir: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

async fn check_dir(dir: &Path) -> CheckStatus {
    match tokio::fs::metadata(dir).await {
        Ok(metadata) if metadata.is_dir() && !metadata.permissions().readonly() => CheckStatus::ok(),
        Ok(_) => CheckStatus::error("not a writable directory"),
        Err(e) => CheckStatus::error(e.kind().to_string()),
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks the FFmpeg binary and both working directories.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let ffmpeg = match check_ffmpeg() {
        Ok(_) => CheckStatus::ok(),
        Err(e) => CheckStatus::error(e.to_string()),
    };
    let staging_dir = check_dir(&state.pipeline().staging_dir).await;
    let output_dir = check_dir(&state.pipeline().output_dir).await;

    let all_ok = ffmpeg.is_ok() && staging_dir.is_ok() && output_dir.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            ffmpeg,
            staging_dir,
            output_dir,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
