use crate::config::AudioFormat;
use crate::error::EngineError;
use crate::program::{DATETIME_LAYOUT, Program};
use chrono::DateTime;
use chrono_tz::Tz;
use std::path::{Path, PathBuf};

/// Where a program's final artifact lives.
///
/// Derived deterministically from program metadata, so re-running a retrieval
/// lands on the same path and the existing file acts as the idempotence
/// marker. Layout: `{root}/{stem}/{stem}.{ext}` with stem
/// `{start}_{station}_{title}`; segment scratch space is created inside the
/// per-program directory.
#[derive(Debug, Clone)]
pub struct OutputTarget {
    dir: PathBuf,
    file_stem: String,
    format: AudioFormat,
}

impl OutputTarget {
    pub fn new(
        root: &Path,
        program: &Program,
        start_time: &DateTime<Tz>,
        format: AudioFormat,
    ) -> Self {
        let file_stem = format!(
            "{}_{}_{}",
            start_time.format(DATETIME_LAYOUT),
            program.station_id,
            program.title,
        );
        Self {
            dir: root.join(&file_stem),
            file_stem,
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_stem(&self) -> &str {
        &self.file_stem
    }

    pub fn final_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.file_stem, self.format.extension()))
    }

    pub async fn ensure_dir(&self) -> Result<(), EngineError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Whether a finished artifact already exists at the final path.
    pub fn exists(&self) -> bool {
        self.final_path().is_file()
    }
}
