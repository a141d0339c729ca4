//! Remix job orchestration.
//!
//! One call to [`RemixOrchestrator::process`] drives a job through
//! validate, fetch, verify, transcode, verify and publish. Jobs share no
//! in-memory state; each owns the two paths derived from its id. Any failure
//! after validation removes both paths before the error is returned.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::Instrument;

use remix_media::{
    file_size, parse_http_url, remove_file_if_exists, FfmpegTranscoder, Fetcher, HttpFetcher,
    MediaResult, Transcoder,
};
use remix_models::{EffectCatalog, Job, JobStage, RemixOutcome, RemixRequest};

use crate::cleanup::DeferredCleanup;
use crate::config::PipelineConfig;
use crate::error::{JobError, JobResult};
use crate::logging::JobLogger;

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub audio_url: String,
    pub effect: String,
}

/// Runs remix jobs against a catalog, a fetcher and a transcoder.
pub struct RemixOrchestrator {
    catalog: Arc<EffectCatalog>,
    fetcher: Arc<dyn Fetcher>,
    transcoder: Arc<dyn Transcoder>,
    config: PipelineConfig,
    cleanup: DeferredCleanup,
}

impl RemixOrchestrator {
    pub fn new(
        catalog: Arc<EffectCatalog>,
        fetcher: Arc<dyn Fetcher>,
        transcoder: Arc<dyn Transcoder>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            transcoder,
            config,
            cleanup: DeferredCleanup::new(),
        }
    }

    /// Production wiring: builtin catalog, HTTP fetcher and FFmpeg transcoder.
    pub fn from_config(config: PipelineConfig) -> MediaResult<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout, config.max_redirects)?;
        let transcoder = FfmpegTranscoder::new().with_timeout(config.transcode_timeout);
        Ok(Self::new(
            Arc::new(EffectCatalog::builtin()),
            Arc::new(fetcher),
            Arc::new(transcoder),
            config,
        ))
    }

    pub fn catalog(&self) -> &Arc<EffectCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Pending staging removals; call `shutdown()` on it when stopping.
    pub fn cleanup(&self) -> &DeferredCleanup {
        &self.cleanup
    }

    /// Check a request without touching the network or the filesystem.
    pub fn validate(&self, request: &RemixRequest) -> JobResult<ValidatedRequest> {
        let audio_url = request
            .audio_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(JobError::MissingInput)?;

        parse_http_url(audio_url).map_err(|_| JobError::InvalidUrl(audio_url.to_string()))?;

        let effect = match request.effect.as_deref().map(str::trim) {
            None | Some("") => self.catalog.default_id(),
            Some(effect) => effect,
        };

        let effect = self
            .catalog
            .resolve(effect)
            .ok_or_else(|| JobError::InvalidEffect {
                requested: effect.to_string(),
                available: self.catalog.ids(),
            })?;

        Ok(ValidatedRequest {
            audio_url: audio_url.to_string(),
            effect: effect.to_string(),
        })
    }

    /// Run one job to a terminal outcome.
    pub async fn process(&self, request: RemixRequest) -> JobResult<RemixOutcome> {
        let validated = match self.validate(&request) {
            Ok(validated) => validated,
            Err(e) => {
                counter!("remix_jobs_total", "outcome" => "rejected").increment(1);
                return Err(e);
            }
        };

        let job = Job::new(
            validated.effect,
            validated.audio_url,
            &self.config.staging_dir,
            &self.config.output_dir,
        );
        let mut logger = JobLogger::new(&job.id, &job.effect);
        let span = logger.create_span();

        async move {
            logger.log_start(&job.source_url);
            let start = Instant::now();

            let result = self.execute(&job, &mut logger).await;
            histogram!("remix_job_duration_seconds").record(start.elapsed().as_secs_f64());

            match result {
                Ok(outcome) => {
                    logger.enter(JobStage::Succeeded);
                    self.cleanup
                        .schedule(job.staging_path.clone(), self.config.staging_grace);
                    logger.log_completion(outcome.file_size, outcome.elapsed.as_millis() as u64);
                    counter!("remix_jobs_total", "outcome" => "succeeded").increment(1);
                    Ok(outcome)
                }
                Err(err) => {
                    logger.log_error(err.code(), &err.to_string());
                    logger.enter(JobStage::Failed);
                    self.discard(&job, &logger).await;
                    counter!("remix_jobs_total", "outcome" => "failed").increment(1);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, job: &Job, logger: &mut JobLogger) -> JobResult<RemixOutcome> {
        logger.enter(JobStage::Fetching);
        let report = self
            .fetcher
            .fetch(&job.source_url, &job.staging_path)
            .await
            .map_err(JobError::from_fetch)?;
        logger.log_progress(&format!(
            "downloaded {} bytes ({} redirects)",
            report.bytes, report.redirects
        ));

        logger.enter(JobStage::VerifyingInput);
        let source_size = self.size_of(&job.staging_path).await?;
        if source_size <= self.config.min_file_size {
            return Err(JobError::InvalidSourceFile { size: source_size });
        }

        logger.enter(JobStage::Transcoding);
        let chain = self
            .catalog
            .lookup(&job.effect)
            .ok_or_else(|| JobError::internal(format!("effect '{}' vanished from catalog", job.effect)))?;
        self.transcoder
            .transcode(&job.staging_path, chain, &job.publish_path)
            .await
            .map_err(JobError::from_transcode)?;

        logger.enter(JobStage::VerifyingOutput);
        let output_size = self.size_of(&job.publish_path).await?;
        if output_size <= self.config.min_file_size {
            return Err(JobError::TranscodeIncomplete { size: output_size });
        }

        logger.enter(JobStage::Publishing);
        Ok(RemixOutcome {
            job_id: job.id.clone(),
            effect: job.effect.clone(),
            file_name: job.publish_file_name(),
            file_size: output_size,
            elapsed: job.elapsed(),
        })
    }

    async fn size_of(&self, path: &Path) -> JobResult<u64> {
        file_size(path)
            .await
            .map(|size| size.unwrap_or(0))
            .map_err(|e| JobError::internal(format!("stat {}: {}", path.display(), e)))
    }

    /// Remove both job paths; failures are logged, never returned.
    async fn discard(&self, job: &Job, logger: &JobLogger) {
        for path in [&job.staging_path, &job.publish_path] {
            if let Err(e) = remove_file_if_exists(path).await {
                logger.log_warning(&format!("cleanup of {} failed: {}", path.display(), e));
            }
        }
    }
}
