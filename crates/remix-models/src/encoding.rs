//! Audio output encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lossy output codec
pub const OUTPUT_AUDIO_CODEC: &str = "libmp3lame";
/// Output bitrate
pub const OUTPUT_AUDIO_BITRATE: &str = "256k";
/// Output sample rate (Hz)
pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;
/// Encoder algorithm quality (0 = best for LAME)
pub const OUTPUT_COMPRESSION_LEVEL: u8 = 0;
/// Extension of published files
pub const OUTPUT_EXTENSION: &str = "mp3";
/// MIME type of published files
pub const OUTPUT_CONTENT_TYPE: &str = "audio/mpeg";

/// Audio encoding configuration for published files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioEncoding {
    pub codec: String,
    pub bitrate: String,
    pub sample_rate: u32,
    pub compression_level: u8,
}

impl Default for AudioEncoding {
    fn default() -> Self {
        Self {
            codec: OUTPUT_AUDIO_CODEC.to_string(),
            bitrate: OUTPUT_AUDIO_BITRATE.to_string(),
            sample_rate: OUTPUT_SAMPLE_RATE,
            compression_level: OUTPUT_COMPRESSION_LEVEL,
        }
    }
}

impl AudioEncoding {
    /// Convert to FFmpeg output arguments.
    ///
    /// `-vn` drops embedded cover art so only the audio stream is encoded.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-vn".to_string(),
            "-c:a".to_string(),
            self.codec.clone(),
            "-b:a".to_string(),
            self.bitrate.clone(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-compression_level".to_string(),
            self.compression_level.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_encoding() {
        let enc = AudioEncoding::default();
        assert_eq!(enc.codec, "libmp3lame");
        assert_eq!(enc.bitrate, "256k");
        assert_eq!(enc.sample_rate, 44100);
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = AudioEncoding::default().to_ffmpeg_args();
        let pos = args.iter().position(|a| a == "-b:a").unwrap();
        assert_eq!(args[pos + 1], "256k");
        let pos = args.iter().position(|a| a == "-ar").unwrap();
        assert_eq!(args[pos + 1], "44100");
        assert!(args.contains(&"-compression_level".to_string()));
    }
}
