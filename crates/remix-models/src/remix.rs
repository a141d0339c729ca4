//! Request and response schemas for the remix endpoint.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::effect::DEFAULT_EFFECT;

/// Body of `POST /remix`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemixRequest {
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub effect: Option<String>,
}

impl RemixRequest {
    pub fn new(audio_url: impl Into<String>, effect: Option<&str>) -> Self {
        Self {
            audio_url: Some(audio_url.into()),
            effect: effect.map(str::to_string),
        }
    }

    /// Example payload shown to clients.
    pub fn example() -> Self {
        Self {
            audio_url: Some("https://example.com/song.mp3".to_string()),
            effect: Some(DEFAULT_EFFECT.to_string()),
        }
    }
}

/// Successful remix response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemixResponse {
    pub success: bool,
    pub effect: String,
    pub download_url: String,
    pub processing_time: String,
    pub file_size: String,
    pub message: String,
}

/// Render a duration as seconds with two decimals (`"4.21s"`).
pub fn format_processing_time(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

/// Render a byte count as megabytes with two decimals (`"3.45 MB"`).
pub fn format_file_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1_048_576.0)
}
