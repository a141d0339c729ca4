//! Job error types.

use remix_media::MediaError;
use thiserror::Error;

pub type JobResult<T> = Result<T, JobError>;

/// Terminal failure reasons of a remix job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("audioUrl is required")]
    MissingInput,

    #[error("audioUrl is not a valid http(s) URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid effect '{requested}'")]
    InvalidEffect {
        requested: String,
        available: Vec<String>,
    },

    #[error("Download failed: {detail}")]
    DownloadFailed { status: Option<u16>, detail: String },

    #[error("Download timed out after {secs} seconds")]
    DownloadTimeout { secs: u64 },

    #[error("Downloaded file is too small ({size} bytes); the URL may not point to an audio file")]
    InvalidSourceFile { size: u64 },

    #[error("Audio processing failed: {message}")]
    TranscodeFailed { message: String },

    #[error("Audio processing timed out after {secs} seconds")]
    TranscodeTimeout { secs: u64 },

    #[error("Processed file is incomplete ({size} bytes)")]
    TranscodeIncomplete { size: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map a fetcher failure.
    pub fn from_fetch(err: MediaError) -> Self {
        match err {
            // Submitted URLs are checked before fetching; this is a redirect hop
            MediaError::InvalidUrl(detail) => Self::DownloadFailed {
                status: None,
                detail: format!("invalid redirect target: {}", detail),
            },
            MediaError::DownloadTimeout(secs) => Self::DownloadTimeout { secs },
            MediaError::HttpStatus { status } => Self::DownloadFailed {
                status: Some(status),
                detail: format!("HTTP status {}", status),
            },
            other => Self::DownloadFailed {
                status: None,
                detail: other.to_string(),
            },
        }
    }

    /// Map a transcoder failure.
    pub fn from_transcode(err: MediaError) -> Self {
        match err {
            MediaError::FfmpegFailed { message, .. } => Self::TranscodeFailed { message },
            MediaError::Timeout(secs) => Self::TranscodeTimeout { secs },
            other => Self::Internal(other.to_string()),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            JobError::MissingInput => "MISSING_INPUT",
            JobError::InvalidUrl(_) => "INVALID_URL",
            JobError::InvalidEffect { .. } => "INVALID_EFFECT",
            JobError::DownloadFailed { .. } => "DOWNLOAD_FAILED",
            JobError::DownloadTimeout { .. } => "DOWNLOAD_TIMEOUT",
            JobError::InvalidSourceFile { .. } => "INVALID_SOURCE_FILE",
            JobError::TranscodeFailed { .. } => "TRANSCODE_FAILED",
            JobError::TranscodeTimeout { .. } => "TRANSCODE_TIMEOUT",
            JobError::TranscodeIncomplete { .. } => "TRANSCODE_INCOMPLETE",
            JobError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Short human-readable title.
    pub fn title(&self) -> &'static str {
        match self {
            JobError::MissingInput => "audioUrl is required",
            JobError::InvalidUrl(_) => "Invalid audioUrl",
            JobError::InvalidEffect { .. } => "Invalid effect",
            JobError::DownloadFailed { .. } | JobError::DownloadTimeout { .. } => "Download failed",
            JobError::InvalidSourceFile { .. } => "Invalid audio file",
            JobError::TranscodeFailed { .. }
            | JobError::TranscodeTimeout { .. }
            | JobError::TranscodeIncomplete { .. } => "Processing failed",
            JobError::Internal(_) => "Internal server error",
        }
    }

    /// Validation failures the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            JobError::MissingInput | JobError::InvalidUrl(_) | JobError::InvalidEffect { .. }
        )
    }

    /// Actionable hints returned alongside processing failures.
    pub fn tips(&self) -> Vec<&'static str> {
        match self {
            JobError::DownloadFailed { .. } | JobError::DownloadTimeout { .. } => vec![
                "Make sure the audio URL is publicly accessible",
                "Use a direct download link rather than a web page",
                "Try hosting the file on a service that allows direct downloads",
            ],
            JobError::InvalidSourceFile { .. } => vec![
                "Make sure the URL points to an audio file, not an HTML page",
                "Supported inputs include MP3, WAV, M4A, OGG and FLAC",
            ],
            JobError::TranscodeFailed { .. } | JobError::TranscodeIncomplete { .. } => vec![
                "Make sure the source is a valid, uncorrupted audio file",
                "Files under 50 MB are recommended",
            ],
            JobError::TranscodeTimeout { .. } => vec![
                "Try a shorter audio file",
                "Files under 50 MB are recommended",
            ],
            JobError::Internal(_) => vec!["Try again in a few moments"],
            JobError::MissingInput | JobError::InvalidUrl(_) | JobError::InvalidEffect { .. } => {
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_status_mapping() {
        let err = JobError::from_fetch(MediaError::HttpStatus { status: 404 });
        match &err {
            JobError::DownloadFailed { status, detail } => {
                assert_eq!(*status, Some(404));
                assert!(detail.contains("404"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(err.code(), "DOWNLOAD_FAILED");
        assert!(!err.is_client_error());
        assert!(!err.tips().is_empty());
    }

    #[test]
    fn test_fetch_bad_redirect_is_download_failure() {
        let err = JobError::from_fetch(MediaError::InvalidUrl("unsupported scheme 'ftp'".into()));
        assert_eq!(err.code(), "DOWNLOAD_FAILED");
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("invalid redirect target"));
    }

    #[test]
    fn test_fetch_timeout_mapping() {
        let err = JobError::from_fetch(MediaError::DownloadTimeout(60));
        assert!(matches!(err, JobError::DownloadTimeout { secs: 60 }));
    }

    #[test]
    fn test_transcode_mapping_keeps_engine_message() {
        let err = JobError::from_transcode(MediaError::ffmpeg_failed("No such filter: 'bogus'", Some(1)));
        match err {
            JobError::TranscodeFailed { message } => assert_eq!(message, "No such filter: 'bogus'"),
            other => panic!("unexpected {:?}", other),
        }

        let err = JobError::from_transcode(MediaError::Timeout(300));
        assert_eq!(err.code(), "TRANSCODE_TIMEOUT");
    }

    #[test]
    fn test_client_errors() {
        assert!(JobError::MissingInput.is_client_error());
        assert!(JobError::InvalidEffect {
            requested: "x".into(),
            available: vec![]
        }
        .is_client_error());
        assert!(!JobError::InvalidSourceFile { size: 10 }.is_client_error());
        assert!(!JobError::internal("boom").is_client_error());
    }
}
