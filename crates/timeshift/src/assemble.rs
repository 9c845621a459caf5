// Assembly and transcoding collaborators. The default implementations shell
// out to ffmpeg; both kill the child process promptly on cancellation.

use crate::error::EngineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Concatenates ordered segment files into one raw audio file.
#[async_trait]
pub trait Assembler: Send + Sync {
    /// `segments` is in playlist order; the result file is created inside
    /// `work_dir`, which the caller owns and removes.
    async fn concat(
        &self,
        segments: &[PathBuf],
        work_dir: &Path,
        token: &CancellationToken,
    ) -> Result<PathBuf, EngineError>;
}

/// Re-encodes a raw audio file into the target format at `output`.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        token: &CancellationToken,
    ) -> Result<(), EngineError>;
}

/// [`Assembler`] using ffmpeg's concat demuxer with stream copy.
pub struct FfmpegAssembler {
    ffmpeg: PathBuf,
}

impl FfmpegAssembler {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }
}

impl Default for FfmpegAssembler {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Assembler for FfmpegAssembler {
    async fn concat(
        &self,
        segments: &[PathBuf],
        work_dir: &Path,
        token: &CancellationToken,
    ) -> Result<PathBuf, EngineError> {
        if segments.is_empty() {
            return Err(EngineError::assembly("no segments to concatenate"));
        }

        let list_path = work_dir.join("concat.txt");
        let mut list = String::new();
        for path in segments {
            list.push_str(&format!("file '{}'\n", path.display()));
        }
        tokio::fs::write(&list_path, list).await?;

        let output = work_dir.join("assembled.aac");
        debug!(segments = segments.len(), output = %output.display(), "concatenating segments");
        let mut child = Command::new(&self.ffmpeg)
            .arg("-y")
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(&list_path)
            .args(["-c", "copy"])
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let status = tokio::select! {
            // Dropping the child kills the ffmpeg process.
            _ = token.cancelled() => return Err(EngineError::Cancelled),
            status = child.wait() => status?,
        };
        if !status.success() {
            return Err(EngineError::assembly(format!(
                "ffmpeg concat exited with {status}"
            )));
        }
        Ok(output)
    }
}

/// [`Transcoder`] re-encoding to MP3 via ffmpeg.
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        token: &CancellationToken,
    ) -> Result<(), EngineError> {
        debug!(input = %input.display(), output = %output.display(), "transcoding");
        let mut child = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-c:a", "libmp3lame", "-b:a", "192k"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let status = tokio::select! {
            _ = token.cancelled() => return Err(EngineError::Cancelled),
            status = child.wait() => status?,
        };
        if !status.success() {
            return Err(EngineError::transcode(format!(
                "ffmpeg exited with {status}"
            )));
        }
        Ok(())
    }
}
