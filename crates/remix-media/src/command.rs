//! FFmpeg invocation for audio renders.
//!
//! [`FfmpegCommand`] describes one input, an optional `-af` chain and the
//! encoder arguments. [`FfmpegRunner`] spawns it with `-progress pipe:2` and
//! splits stderr into progress observations and diagnostic lines.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Diagnostic stderr lines kept for a failure report.
const MAX_DIAGNOSTIC_LINES: usize = 64;

/// One audio render: input, filter chain, encoder args, output.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    filter: Option<String>,
    encoder_args: Vec<String>,
    verbosity: &'static str,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            filter: None,
            encoder_args: Vec::new(),
            verbosity: "error",
        }
    }

    /// Serialized `-af` filter graph.
    pub fn audio_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Encoder arguments placed after the filter graph.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.encoder_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Full argument vector, without the program name.
    pub fn build_args(&self) -> Vec<String> {
        let head = ["-y", "-nostdin", "-v", self.verbosity, "-progress", "pipe:2", "-i"];

        let mut args: Vec<String> = head.iter().map(|s| s.to_string()).collect();
        args.push(self.input.to_string_lossy().into_owned());
        if let Some(filter) = &self.filter {
            args.push("-af".to_string());
            args.push(filter.clone());
        }
        args.extend(self.encoder_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Spawns [`FfmpegCommand`]s, optionally bounded by a ceiling.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    ceiling: Option<Duration>,
    program: Option<PathBuf>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this binary instead of resolving `ffmpeg` on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Kill the process and fail with [`MediaError::Timeout`] after `ceiling`.
    pub fn with_timeout(mut self, ceiling: Duration) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run `cmd`, feeding every complete progress block to `on_progress`.
    ///
    /// On a non-zero exit the captured diagnostic lines become the
    /// [`MediaError::FfmpegFailed`] message.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        let program = match &self.program {
            Some(program) => program.clone(),
            None => check_ffmpeg()?,
        };
        let args = cmd.build_args();
        debug!(program = %program.display(), args = %args.join(" "), "Spawning FFmpeg");

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("stderr was not piped", None))?;
        let collector = tokio::spawn(collect_stderr(stderr, on_progress));

        let waited = self.wait(&mut child).await;
        let diagnostics = collector.await.unwrap_or_default();

        match waited {
            Err(MediaError::FfmpegFailed { exit_code, .. }) if !diagnostics.is_empty() => {
                Err(MediaError::ffmpeg_failed(diagnostics.join("\n"), exit_code))
            }
            other => other,
        }
    }

    async fn wait(&self, child: &mut Child) -> MediaResult<()> {
        let status = match self.ceiling {
            None => child.wait().await?,
            Some(ceiling) => match tokio::time::timeout(ceiling, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(ceiling_secs = ceiling.as_secs(), "FFmpeg exceeded its ceiling, killing");
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill FFmpeg: {}", e);
                    }
                    return Err(MediaError::Timeout(ceiling.as_secs()));
                }
            },
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                format!("FFmpeg exited with {}", status),
                status.code(),
            ))
        }
    }
}

/// Drain stderr, reporting progress and keeping diagnostic lines.
async fn collect_stderr<F>(stderr: ChildStderr, on_progress: F) -> Vec<String>
where
    F: Fn(FfmpegProgress),
{
    let mut lines = BufReader::new(stderr).lines();
    let mut parser = ProgressParser::default();
    let mut diagnostics = Vec::new();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parser.feed(line) {
            Feed::Block(progress) => on_progress(progress),
            Feed::Field => {}
            Feed::NotProgress => {
                if diagnostics.len() < MAX_DIAGNOSTIC_LINES {
                    diagnostics.push(line.to_string());
                }
            }
        }
    }

    diagnostics
}

enum Feed {
    /// A `progress=` line closed a block.
    Block(FfmpegProgress),
    Field,
    NotProgress,
}

/// Accumulates `key=value` lines into [`FfmpegProgress`] blocks.
#[derive(Default)]
struct ProgressParser {
    current: FfmpegProgress,
}

impl ProgressParser {
    fn feed(&mut self, line: &str) -> Feed {
        let Some((key, value)) = line.split_once('=') else {
            return Feed::NotProgress;
        };
        if !is_progress_key(key) {
            return Feed::NotProgress;
        }

        match key {
            // Both carry microseconds
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_ms = us / 1000;
                }
            }
            "out_time" => self.current.out_time = value.to_string(),
            "total_size" => {
                if let Ok(size) = value.parse() {
                    self.current.total_size = size;
                }
            }
            "speed" => {
                if let Some(speed) = value.trim().strip_suffix('x').and_then(|s| s.parse().ok()) {
                    self.current.speed = speed;
                }
            }
            "progress" => {
                self.current.is_complete = value == "end";
                return Feed::Block(self.current.clone());
            }
            _ => {}
        }
        Feed::Field
    }
}

fn is_progress_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Locate the `ffmpeg` binary on `PATH`.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}
