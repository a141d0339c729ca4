//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use remix_media::{ensure_dir, MediaResult};

/// Working directories, limits and timers for remix jobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Downloaded sources awaiting transformation
    pub staging_dir: PathBuf,
    /// Published outputs served to clients
    pub output_dir: PathBuf,
    /// Overall download deadline
    pub fetch_timeout: Duration,
    /// Ceiling on a single FFmpeg run
    pub transcode_timeout: Duration,
    /// Files must be strictly larger than this to count as audio
    pub min_file_size: u64,
    /// Delay before a successful job's staging file is removed
    pub staging_grace: Duration,
    /// Files older than this are swept
    pub retention: Duration,
    /// Sweeper tick period
    pub sweep_interval: Duration,
    /// Redirect hop cap for downloads
    pub max_redirects: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("/tmp/remix/staging"),
            output_dir: PathBuf::from("/tmp/remix/outputs"),
            fetch_timeout: Duration::from_secs(60),
            transcode_timeout: Duration::from_secs(300), // 5 minutes
            min_file_size: 1000,
            staging_grace: Duration::from_secs(5),
            retention: Duration::from_secs(3600), // 1 hour
            sweep_interval: Duration::from_secs(3600),
            max_redirects: 5,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            staging_dir: std::env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            fetch_timeout: env_secs("FETCH_TIMEOUT_SECS").unwrap_or(defaults.fetch_timeout),
            transcode_timeout: env_secs("TRANSCODE_TIMEOUT_SECS")
                .unwrap_or(defaults.transcode_timeout),
            min_file_size: std::env::var("MIN_FILE_SIZE_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_file_size),
            staging_grace: env_secs("STAGING_GRACE_SECS").unwrap_or(defaults.staging_grace),
            retention: env_secs("RETENTION_SECS").unwrap_or(defaults.retention),
            sweep_interval: env_secs("SWEEP_INTERVAL_SECS")
                .filter(|d| !d.is_zero())
                .unwrap_or(defaults.sweep_interval),
            max_redirects: std::env::var("MAX_REDIRECTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_redirects),
        }
    }

    /// Config rooted at a single base directory, with default timers.
    pub fn with_base_dir(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            staging_dir: base.join("staging"),
            output_dir: base.join("outputs"),
            ..Self::default()
        }
    }

    /// Create both working directories if absent.
    pub async fn ensure_dirs(&self) -> MediaResult<()> {
        ensure_dir(&self.staging_dir).await?;
        ensure_dir(&self.output_dir).await
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}
