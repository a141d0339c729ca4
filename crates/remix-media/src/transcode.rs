//! Effect rendering through the FFmpeg CLI.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use tracing::{debug, info, warn};

use remix_models::{serialize_chain, AudioEncoding, FilterDirective};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Applies a filter chain to an input file and writes the encoded output.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Render `input` through `chain` into `output`.
    ///
    /// Engine failures surface as [`MediaError::FfmpegFailed`] carrying the
    /// engine's own message; filter names are not validated here.
    async fn transcode(&self, input: &Path, chain: &[FilterDirective], output: &Path) -> MediaResult<()>;
}

/// FFmpeg-backed transcoder.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    encoding: AudioEncoding,
    timeout: Option<Duration>,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self {
            encoding: AudioEncoding::default(),
            timeout: None,
        }
    }

    /// Kill the engine and fail with [`MediaError::Timeout`] after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_encoding(mut self, encoding: AudioEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Build the FFmpeg invocation for a chain.
    pub fn build_command(&self, input: &Path, chain: &[FilterDirective], output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(input, output);
        if !chain.is_empty() {
            cmd = cmd.audio_filter(serialize_chain(chain));
        }
        cmd.output_args(self.encoding.to_ffmpeg_args())
    }

    fn runner(&self) -> FfmpegRunner {
        match self.timeout {
            Some(timeout) => FfmpegRunner::new().with_timeout(timeout),
            None => FfmpegRunner::new(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, chain: &[FilterDirective], output: &Path) -> MediaResult<()> {
        let cmd = self.build_command(input, chain, output);
        let start = Instant::now();

        info!(
            input = %input.display(),
            output = %output.display(),
            filters = chain.len(),
            "Transcoding audio"
        );

        let result = self
            .runner()
            .run_with_progress(&cmd, |progress| {
                debug!(
                    out_time = %progress.out_time,
                    speed = progress.speed,
                    complete = progress.is_complete,
                    "FFmpeg progress"
                );
            })
            .await;

        histogram!("remix_ffmpeg_duration_seconds").record(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                info!(duration_ms = start.elapsed().as_millis() as u64, "Transcode complete");
                Ok(())
            }
            Err(MediaError::Timeout(secs)) => {
                warn!(secs, output = %output.display(), "Transcode timed out");
                Err(MediaError::Timeout(secs))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remix_models::EffectCatalog;

    #[test]
    fn test_build_command_uses_chain_and_encoding() {
        let catalog = EffectCatalog::builtin();
        let chain = catalog.lookup("lofi").unwrap();
        let cmd = FfmpegTranscoder::new().build_command(Path::new("in.audio"), chain, Path::new("out.mp3"));
        let args = cmd.build_args();

        let af = args.iter().position(|a| a == "-af").unwrap();
        assert_eq!(args[af + 1], serialize_chain(chain));
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"libmp3lame".to_string()));
        assert!(args.contains(&"256k".to_string()));
        assert!(args.contains(&"44100".to_string()));
        assert_eq!(args.last().unwrap(), "out.mp3");
    }

    #[test]
    fn test_build_command_without_filters() {
        let cmd = FfmpegTranscoder::new().build_command(Path::new("in"), &[], Path::new("out.mp3"));
        assert!(!cmd.build_args().contains(&"-af".to_string()));
    }
}
