//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while fetching or transcoding audio.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Download failed with HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Download timed out after {0} seconds")]
    DownloadTimeout(u64),

    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// HTTP status reported by the origin, if this is a status failure.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            MediaError::HttpStatus { status } => Some(*status),
            _ => None,
        }
    }
}
