//! Filesystem helpers shared by jobs and the retention sweeper.
//!
//! Removal is idempotent: a job's own cleanup, a delayed cleanup task and the
//! sweeper may all race on the same path, and "already gone" counts as done.

use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;

use crate::error::MediaResult;

/// Remove a file, treating a missing file as success.
///
/// Returns `true` when this call removed the file.
pub async fn remove_file_if_exists(path: impl AsRef<Path>) -> MediaResult<bool> {
    match fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Size of a file in bytes, or `None` when it does not exist.
pub async fn file_size(path: impl AsRef<Path>) -> MediaResult<Option<u64>> {
    match fs::metadata(path.as_ref()).await {
        Ok(metadata) => Ok(Some(metadata.len())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Create a directory (and parents) if absent.
pub async fn ensure_dir(path: impl AsRef<Path>) -> MediaResult<()> {
    fs::create_dir_all(path.as_ref()).await?;
    Ok(())
}
