//! Supervised delayed removal of staging files.
//!
//! Successful jobs hand their staging file here instead of removing it inline.
//! Every removal runs on a tracked task, so shutdown can cancel the remaining
//! delays, remove the files right away and wait for all of them to finish.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use remix_media::remove_file_if_exists;

/// Tracker of pending staging-file removals.
#[derive(Debug, Clone, Default)]
pub struct DeferredCleanup {
    tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl DeferredCleanup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `path` after `delay`, or immediately once shutdown starts.
    pub fn schedule(&self, path: PathBuf, delay: Duration) {
        let token = self.cancellation_token.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => {
                    debug!(path = %path.display(), "Shutdown, removing staging file early");
                }
            }

            match remove_file_if_exists(&path).await {
                Ok(true) => debug!(path = %path.display(), "Removed staging file"),
                Ok(false) => debug!(path = %path.display(), "Staging file already gone"),
                Err(e) => warn!(path = %path.display(), "Failed to remove staging file: {}", e),
            }
        });
    }

    /// Removals still waiting or running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Cut every pending delay short and wait for the removals to complete.
    pub async fn shutdown(&self) {
        self.cancellation_token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
