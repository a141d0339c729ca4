//! Background retention sweeper.
//!
//! Periodically deletes files whose last-modified time is older than the
//! retention window, across the staging and publish directories. Jobs may be
//! removing the same files concurrently; a file that is already gone is
//! simply skipped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use metrics::counter;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use remix_media::remove_file_if_exists;

use crate::config::PipelineConfig;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular files inspected
    pub scanned: usize,
    /// Files removed by this sweep
    pub removed: usize,
    /// Entries that could not be inspected or removed
    pub failed: usize,
}

/// Time-based garbage collector for working directories.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    dirs: Vec<PathBuf>,
    retention: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(dirs: Vec<PathBuf>, retention: Duration, interval: Duration) -> Self {
        Self {
            dirs,
            retention,
            interval,
        }
    }

    /// Sweeper over the staging and output directories of a pipeline.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            vec![config.staging_dir.clone(), config.output_dir.clone()],
            config.retention,
            config.sweep_interval,
        )
    }

    /// Run sweeps on a fixed period until `shutdown` is cancelled.
    ///
    /// The first sweep runs immediately, clearing leftovers from a previous run.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            "Starting retention sweeper (interval: {:?}, retention: {:?})",
            self.interval, self.retention
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Retention sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.sweep_once().await;
                    if report.removed > 0 || report.failed > 0 {
                        info!(
                            "Retention sweep complete: {} scanned, {} removed, {} failed",
                            report.scanned, report.removed, report.failed
                        );
                    }
                }
            }
        }
    }

    /// Sweep every directory once.
    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let Some(cutoff) = SystemTime::now().checked_sub(self.retention) else {
            return report;
        };

        for dir in &self.dirs {
            self.sweep_dir(dir, cutoff, &mut report).await;
        }

        if report.removed > 0 {
            counter!("remix_sweeper_removed_total").increment(report.removed as u64);
        }
        report
    }

    async fn sweep_dir(&self, dir: &Path, cutoff: SystemTime, report: &mut SweepReport) {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Sweep directory missing, skipping");
                return;
            }
            Err(e) => {
                warn!(dir = %dir.display(), "Failed to read sweep directory: {}", e);
                report.failed += 1;
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), "Failed to list sweep directory: {}", e);
                    report.failed += 1;
                    break;
                }
            };

            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), "Failed to stat file: {}", e);
                    report.failed += 1;
                    continue;
                }
            };

            if !metadata.is_file() {
                continue;
            }
            report.scanned += 1;

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), "No modification time: {}", e);
                    report.failed += 1;
                    continue;
                }
            };

            if modified >= cutoff {
                continue;
            }

            match remove_file_if_exists(&path).await {
                Ok(true) => {
                    debug!(path = %path.display(), "Removed expired file");
                    report.removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %path.display(), "Failed to remove expired file: {}", e);
                    report.failed += 1;
                }
            }
        }
    }
}
