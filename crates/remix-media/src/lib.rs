#![deny(unreachable_patterns)]
//! Media plumbing for the remix service.
//!
//! This crate provides:
//! - Streaming HTTP downloads with bounded redirects
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Idempotent file cleanup helpers

pub mod command;
pub mod error;
pub mod fetch;
pub mod fs_utils;
pub mod progress;
pub mod transcode;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fetch::{
    parse_http_url, FetchReport, Fetcher, HttpFetcher, BROWSER_USER_AGENT, DEFAULT_FETCH_TIMEOUT,
    DEFAULT_MAX_REDIRECTS,
};
pub use fs_utils::{ensure_dir, file_size, remove_file_if_exists};
pub use progress::{FetchProgress, FetchProgressCallback, FfmpegProgress};
pub use transcode::{FfmpegTranscoder, Transcoder};
