//! Structured job logging utilities.
//!
//! Every event carries the job id and the stage the job is in, so a single
//! request can be followed through the logs.

use tracing::{error, info, warn, Span};

use remix_models::{JobId, JobStage};

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    effect: String,
    stage: JobStage,
}

impl JobLogger {
    /// Create a new job logger for a job and its effect.
    pub fn new(job_id: &JobId, effect: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            effect: effect.to_string(),
            stage: JobStage::Validating,
        }
    }

    /// Record a stage transition.
    pub fn enter(&mut self, stage: JobStage) {
        self.stage = stage;
        info!(
            job_id = %self.job_id,
            effect = %self.effect,
            stage = %self.stage,
            "Job stage"
        );
    }

    pub fn log_start(&self, source_url: &str) {
        info!(
            job_id = %self.job_id,
            effect = %self.effect,
            source_url = %source_url,
            "Job started"
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Job warning: {}", message
        );
    }

    /// Log a failure in the current stage.
    pub fn log_error(&self, code: &str, message: &str) {
        error!(
            job_id = %self.job_id,
            effect = %self.effect,
            stage = %self.stage,
            code = %code,
            "Job failed: {}", message
        );
    }

    pub fn log_completion(&self, file_size: u64, elapsed_ms: u64) {
        info!(
            job_id = %self.job_id,
            effect = %self.effect,
            file_size,
            elapsed_ms,
            "Job completed"
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    /// Tracing span covering the job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, effect = %self.effect)
    }
}
