//! API error types.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use remix_models::{format_processing_time, RemixRequest};
use remix_pipeline::JobError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Generic text returned in place of internal failure details.
const INTERNAL_MESSAGE: &str = "An unexpected error occurred while processing the request";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    MalformedBody(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("{source}")]
    Job {
        source: JobError,
        elapsed: Option<Duration>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JobError> for ApiError {
    fn from(source: JobError) -> Self {
        Self::Job {
            source,
            elapsed: None,
        }
    }
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// A job failure observed after `elapsed` of processing.
    pub fn job(source: JobError, elapsed: Duration) -> Self {
        Self::Job {
            source,
            elapsed: Some(elapsed),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Job { source, .. } if source.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Job { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body for both validation (400) and processing (500) failures.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<RemixRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tips: Option<Vec<&'static str>>,
}

impl ApiError {
    fn body(&self) -> ErrorBody {
        match self {
            ApiError::MalformedBody(detail) => ErrorBody {
                error: "Invalid JSON body".to_string(),
                message: Some(detail.clone()),
                example: Some(RemixRequest::example()),
                ..Default::default()
            },
            ApiError::PayloadTooLarge => ErrorBody {
                error: self.to_string(),
                ..Default::default()
            },
            ApiError::Job { source, elapsed } => {
                let processing_time = elapsed.map(format_processing_time);
                match source {
                    JobError::MissingInput | JobError::InvalidUrl(_) => ErrorBody {
                        error: source.to_string(),
                        code: Some(source.code()),
                        example: Some(RemixRequest::example()),
                        ..Default::default()
                    },
                    JobError::InvalidEffect { available, .. } => ErrorBody {
                        error: source.to_string(),
                        code: Some(source.code()),
                        available: Some(available.clone()),
                        ..Default::default()
                    },
                    JobError::Internal(_) => ErrorBody {
                        error: source.title().to_string(),
                        code: Some(source.code()),
                        message: Some(INTERNAL_MESSAGE.to_string()),
                        processing_time,
                        tips: Some(source.tips()),
                        ..Default::default()
                    },
                    _ => ErrorBody {
                        error: source.title().to_string(),
                        code: Some(source.code()),
                        message: Some(source.to_string()),
                        processing_time,
                        tips: Some(source.tips()),
                        ..Default::default()
                    },
                }
            }
            ApiError::Internal(_) => ErrorBody {
                error: "Internal server error".to_string(),
                message: Some(INTERNAL_MESSAGE.to_string()),
                tips: Some(vec!["Try again in a few moments"]),
                ..Default::default()
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Details of internal faults stay in the logs
        if let ApiError::Internal(detail)
        | ApiError::Job {
            source: JobError::Internal(detail),
            ..
        } = &self
        {
            error!("Internal error: {}", detail);
        }

        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_json(err: &ApiError) -> serde_json::Value {
        serde_json::to_value(err.body()).unwrap()
    }

    #[test]
    fn test_missing_input_is_400_with_example() {
        let err = ApiError::from(JobError::MissingInput);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let body = body_json(&err);
        assert_eq!(body["error"], "audioUrl is required");
        assert_eq!(body["example"]["audioUrl"], "https://example.com/song.mp3");
        assert!(body.get("available").is_none());
    }

    #[test]
    fn test_invalid_effect_lists_available() {
        let err = ApiError::from(JobError::InvalidEffect {
            requested: "bogus".into(),
            available: vec!["lofi".into(), "reverb".into()],
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let body = body_json(&err);
        assert_eq!(body["available"], serde_json::json!(["lofi", "reverb"]));
        assert!(body.get("example").is_none());
    }

    #[test]
    fn test_processing_failure_carries_tips_and_time() {
        let err = ApiError::job(
            JobError::DownloadFailed {
                status: Some(404),
                detail: "HTTP status 404".into(),
            },
            Duration::from_millis(1250),
        );
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(&err);
        assert_eq!(body["error"], "Download failed");
        assert!(body["message"].as_str().unwrap().contains("404"));
        assert_eq!(body["processingTime"], "1.25s");
        assert!(!body["tips"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = ApiError::job(
            JobError::internal("stat /tmp/remix/outputs/lofi_1.mp3: permission denied"),
            Duration::from_secs(1),
        );
        let body = serde_json::to_string(&err.body()).unwrap();
        assert!(!body.contains("/tmp/remix"));
        assert!(body.contains(INTERNAL_MESSAGE));
    }
}
