use crate::error::EngineError;
use crate::retry::RetryPolicy;
use chrono_tz::Tz;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Hard cap on simultaneous in-flight segment downloads, process-wide.
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;
/// Per-segment and per-resolution attempt budget.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;
/// Seed delay for time-shift resolution backoff.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(60);

/// Desired encoding of the final artifact.
///
/// Exhaustive on purpose: an unrecognized format name is rejected when the
/// configuration is built, not discovered deep inside the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Lossless pass-through of the broadcast segments.
    Aac,
    /// Transcoded output.
    Mp3,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aac" => Ok(Self::Aac),
            "mp3" => Ok(Self::Mp3),
            other => Err(EngineError::configuration(format!(
                "unrecognized audio format `{other}`"
            ))),
        }
    }
}

/// Configuration for one recorder instance.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Process-wide cap on in-flight segment downloads.
    pub max_concurrency: usize,
    /// Attempt budget per segment download (immediate retry, no delay).
    pub max_retry_attempts: u32,
    /// Backoff policy for time-shift URI resolution.
    pub resolve_retry: RetryPolicy,
    /// Broadcaster's time zone; start timestamps are local to it.
    pub time_zone: Tz,
    /// Root directory under which per-program output directories are created.
    pub output_root: PathBuf,
    /// Desired encoding of the final artifact.
    pub audio_format: AudioFormat,
    /// ISO 639-2 language of the descriptive comment frame.
    pub comment_language: String,
}

impl RecorderConfig {
    pub fn new(output_root: impl Into<PathBuf>, audio_format: AudioFormat) -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            resolve_retry: RetryPolicy::new(DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_INITIAL_DELAY),
            time_zone: chrono_tz::Asia::Tokyo,
            output_root: output_root.into(),
            audio_format,
            comment_language: "jpn".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_concurrency == 0 {
            return Err(EngineError::configuration("max_concurrency must be at least 1"));
        }
        if self.max_retry_attempts == 0 {
            return Err(EngineError::configuration("max_retry_attempts must be at least 1"));
        }
        if self.resolve_retry.max_attempts == 0 {
            return Err(EngineError::configuration(
                "resolve retry policy must allow at least one attempt",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!("aac".parse::<AudioFormat>().unwrap(), AudioFormat::Aac);
        assert_eq!("MP3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
    }

    #[test]
    fn rejects_unknown_format_at_parse_time() {
        let err = "ogg".parse::<AudioFormat>().unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }

    #[test]
    fn default_config_is_valid() {
        let config = RecorderConfig::new("/tmp/out", AudioFormat::Aac);
        config.validate().unwrap();
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut config = RecorderConfig::new("/tmp/out", AudioFormat::Aac);
        config.max_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
