//! Progress observations for fetches and FFmpeg runs.
//!
//! Purely observational: nothing here changes the outcome of an operation.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Progress information from FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Output size in bytes so far
    pub total_size: u64,
    /// Encoding speed (e.g., 40.0 = 40x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

/// Progress of a download.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FetchProgress {
    /// Bytes written so far
    pub downloaded: u64,
    /// Content length reported by the origin
    pub total: Option<u64>,
}

impl FetchProgress {
    /// Percentage of expected bytes, when the origin reported a length.
    pub fn percentage(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => {
                Some(((self.downloaded as f64 / total as f64) * 100.0).min(100.0))
            }
            _ => None,
        }
    }
}

/// Observer for download progress.
pub type FetchProgressCallback = Arc<dyn Fn(FetchProgress) + Send + Sync + 'static>;
