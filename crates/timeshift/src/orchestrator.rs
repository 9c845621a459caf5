// Per-program retrieval pipeline: time check, idempotence check, time-shift
// resolution under backoff, segment listing, bounded download, assembly,
// format finalization, best-effort tagging.

use crate::assemble::{Assembler, Transcoder};
use crate::config::{AudioFormat, RecorderConfig};
use crate::downloader::{BulkDownloader, ordered_segment_paths};
use crate::error::EngineError;
use crate::fetch::{SegmentFetcher, fetch_chunklist};
use crate::output::OutputTarget;
use crate::program::{Program, ProgramId};
use crate::resolve::TimeshiftResolver;
use crate::retry::retry_with_backoff;
use crate::tag::{TagFields, Tagger};
use chrono::DateTime;
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Terminal state of one retrieval attempt.
///
/// Failures never propagate as `Err` to the caller; they are logged with
/// program identity and folded into the outcome, so batch-level visibility
/// is through logs and outcome inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    /// The program has not aired yet; nothing was created or fetched.
    SkippedFuture,
    /// A finished artifact already exists at the output path.
    SkippedExisting,
    /// The pipeline stopped at the given stage; no artifact was produced.
    Failed(FailureStage),
    /// Artifact finalized (and tagged, best-effort) at the given path.
    Completed(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Start-time parsing or output directory creation.
    Preflight,
    /// Time-shift URI resolution exhausted its retries.
    Resolve,
    /// Fetching or parsing the media playlist.
    Listing,
    /// Segment download retries exhausted or cancelled.
    Download,
    /// Segment concatenation.
    Assembly,
    /// Rename or transcode into the final path.
    Finalize,
}

pub struct Orchestrator {
    config: RecorderConfig,
    fetcher: Arc<dyn SegmentFetcher>,
    resolver: Arc<dyn TimeshiftResolver>,
    assembler: Arc<dyn Assembler>,
    transcoder: Arc<dyn Transcoder>,
    tagger: Arc<dyn Tagger>,
    limiter: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(
        config: RecorderConfig,
        fetcher: Arc<dyn SegmentFetcher>,
        resolver: Arc<dyn TimeshiftResolver>,
        assembler: Arc<dyn Assembler>,
        transcoder: Arc<dyn Transcoder>,
        tagger: Arc<dyn Tagger>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let limiter = Arc::new(Semaphore::new(config.max_concurrency));
        Ok(Self {
            config,
            fetcher,
            resolver,
            assembler,
            transcoder,
            tagger,
            limiter,
        })
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Retrieve one program. `now` is captured once per batch so every
    /// program in a run is judged against the same instant.
    pub async fn retrieve(
        &self,
        program: &Program,
        now: DateTime<Tz>,
        token: &CancellationToken,
    ) -> RetrievalOutcome {
        let id = program.id();

        let start_time = match program.start_time(self.config.time_zone) {
            Ok(t) => t,
            Err(e) => {
                error!(program = %id, error = %e, "invalid broadcast start time");
                return RetrievalOutcome::Failed(FailureStage::Preflight);
            }
        };
        if start_time > now {
            info!(program = %id, "program has not aired yet, skipping");
            return RetrievalOutcome::SkippedFuture;
        }

        let target = OutputTarget::new(
            &self.config.output_root,
            program,
            &start_time,
            self.config.audio_format,
        );
        if let Err(e) = target.ensure_dir().await {
            error!(program = %id, error = %e, "failed to create output directory");
            return RetrievalOutcome::Failed(FailureStage::Preflight);
        }
        if target.exists() {
            info!(
                program = %id,
                path = %target.final_path().display(),
                "output already exists, skipping"
            );
            return RetrievalOutcome::SkippedExisting;
        }

        let uri = match retry_with_backoff(&self.config.resolve_retry, token, |_| {
            self.resolver.resolve(program, token)
        })
        .await
        {
            Ok(uri) if !uri.is_empty() => uri,
            Ok(_) => {
                error!(program = %id, "time-shift resolution returned an empty URI");
                return RetrievalOutcome::Failed(FailureStage::Resolve);
            }
            Err(e) => {
                error!(program = %id, error = %e, "failed to resolve time-shift URI");
                return RetrievalOutcome::Failed(FailureStage::Resolve);
            }
        };
        info!(program = %id, uri = %uri, "start downloading");

        let segments = match fetch_chunklist(self.fetcher.as_ref(), &uri).await {
            Ok(segments) if !segments.is_empty() => segments,
            Ok(_) => {
                error!(program = %id, "media playlist lists no segments");
                return RetrievalOutcome::Failed(FailureStage::Listing);
            }
            Err(e) => {
                error!(program = %id, error = %e, "failed to list segments");
                return RetrievalOutcome::Failed(FailureStage::Listing);
            }
        };

        // The scratch directory is removed when `segment_dir` drops, on
        // every exit path below.
        let segment_dir = match tempfile::Builder::new()
            .prefix("segments-")
            .tempdir_in(target.dir())
        {
            Ok(dir) => dir,
            Err(e) => {
                error!(program = %id, error = %e, "failed to create segment directory");
                return RetrievalOutcome::Failed(FailureStage::Download);
            }
        };

        let downloader = BulkDownloader::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.limiter),
            self.config.max_retry_attempts,
        );
        if let Err(e) = downloader
            .download_all(&segments, segment_dir.path(), token)
            .await
        {
            error!(program = %id, error = %e, "failed to download segments");
            return RetrievalOutcome::Failed(FailureStage::Download);
        }

        let ordered = ordered_segment_paths(&segments, segment_dir.path());
        let raw = match self
            .assembler
            .concat(&ordered, segment_dir.path(), token)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                error!(program = %id, error = %e, "failed to assemble segments");
                return RetrievalOutcome::Failed(FailureStage::Assembly);
            }
        };

        let final_path = target.final_path();
        let finalized = match self.config.audio_format {
            AudioFormat::Aac => tokio::fs::rename(&raw, &final_path)
                .await
                .map_err(EngineError::from),
            AudioFormat::Mp3 => self.transcoder.transcode(&raw, &final_path, token).await,
        };
        if let Err(e) = finalized {
            error!(program = %id, error = %e, "failed to produce the result file");
            return RetrievalOutcome::Failed(FailureStage::Finalize);
        }
        drop(segment_dir);

        self.apply_tags(program, &id, target.file_stem(), &final_path)
            .await;

        info!(program = %id, path = %final_path.display(), "file saved");
        RetrievalOutcome::Completed(final_path)
    }

    /// Best-effort tagging; failures are logged and never undo the artifact.
    async fn apply_tags(&self, program: &Program, id: &ProgramId, stem: &str, path: &Path) {
        let fields = TagFields {
            title: stem.to_string(),
            artist: program.performer.clone(),
            album: program.title.clone(),
            year: program.year().to_string(),
            comment: program.description.clone(),
            language: self.config.comment_language.clone(),
        };
        let tagger = Arc::clone(&self.tagger);
        let path = path.to_path_buf();
        match tokio::task::spawn_blocking(move || tagger.write_tags(&path, &fields)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(program = %id, error = %e, "failed to write tags"),
            Err(e) => warn!(program = %id, error = %e, "tagging task failed"),
        }
    }
}
