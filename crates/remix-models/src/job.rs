//! Remix job definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::encoding::OUTPUT_EXTENSION;

/// Per-process sequence mixed into job ids.
static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a job.
///
/// Format: `<unix millis>-<sequence hex>-<random hex>`. The sequence makes ids
/// unique within one process even inside the same millisecond; the random
/// suffix separates processes sharing a working directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new job ID.
    pub fn new() -> Self {
        let millis = Utc::now().timestamp_millis();
        let seq = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{:x}-{}", millis, seq, &random[..8]))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stage of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Validating,
    Fetching,
    VerifyingInput,
    Transcoding,
    VerifyingOutput,
    Publishing,
    Succeeded,
    Failed,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Validating => "validating",
            JobStage::Fetching => "fetching",
            JobStage::VerifyingInput => "verifying_input",
            JobStage::Transcoding => "transcoding",
            JobStage::VerifyingOutput => "verifying_output",
            JobStage::Publishing => "publishing",
            JobStage::Succeeded => "succeeded",
            JobStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Succeeded | JobStage::Failed)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted remix request.
///
/// Lives only for the duration of processing; never persisted.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub effect: String,
    pub source_url: String,
    pub staging_path: PathBuf,
    pub publish_path: PathBuf,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl Job {
    /// Create a job with paths derived from a fresh id.
    pub fn new(
        effect: impl Into<String>,
        source_url: impl Into<String>,
        staging_dir: &Path,
        output_dir: &Path,
    ) -> Self {
        let id = JobId::new();
        let effect = effect.into();
        let staging_path = staging_dir.join(staging_file_name(&id));
        let publish_path = output_dir.join(publish_file_name(&effect, &id));
        Self {
            id,
            effect,
            source_url: source_url.into(),
            staging_path,
            publish_path,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// File name of the published output.
    pub fn publish_file_name(&self) -> String {
        publish_file_name(&self.effect, &self.id)
    }

    /// Wall-clock time since the job was accepted.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Staging file name for a job.
pub fn staging_file_name(id: &JobId) -> String {
    format!("{}_source.audio", id)
}

/// Publish file name for a job and effect.
pub fn publish_file_name(effect: &str, id: &JobId) -> String {
    format!("{}_{}.{}", effect, id, OUTPUT_EXTENSION)
}

/// Result metadata of a succeeded job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RemixOutcome {
    pub job_id: JobId,
    pub effect: String,
    pub file_name: String,
    pub file_size: u64,
    #[schemars(with = "f64")]
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_job_ids_unique_within_same_millisecond() {
        let ids: HashSet<JobId> = (0..10_000).map(|_| JobId::new()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_job_ids_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..1000).map(|_| JobId::new()).collect::<Vec<_>>()))
            .collect();
        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id));
            }
        }
        assert_eq!(ids.len(), 8000);
    }

    #[test]
    fn test_job_paths() {
        let job = Job::new(
            "lofi",
            "https://example.com/a.mp3",
            Path::new("/tmp/staging"),
            Path::new("/tmp/out"),
        );
        assert!(job.staging_path.starts_with("/tmp/staging"));
        assert!(job.publish_path.starts_with("/tmp/out"));
        let name = job.publish_file_name();
        assert!(name.starts_with("lofi_"));
        assert!(name.ends_with(".mp3"));
        assert_eq!(job.publish_path.file_name().unwrap().to_str().unwrap(), name);
    }

    #[test]
    fn test_distinct_jobs_never_share_paths() {
        let a = Job::new("lofi", "u", Path::new("/s"), Path::new("/o"));
        let b = Job::new("lofi", "u", Path::new("/s"), Path::new("/o"));
        assert_ne!(a.staging_path, b.staging_path);
        assert_ne!(a.publish_path, b.publish_path);
    }

    #[test]
    fn test_stage_terminal() {
        assert!(JobStage::Succeeded.is_terminal());
        assert!(JobStage::Failed.is_terminal());
        assert!(!JobStage::Transcoding.is_terminal());
    }
}
