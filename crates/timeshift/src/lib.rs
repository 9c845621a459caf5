// Time-shifted radio retrieval engine.
//
// Resolves a program's streaming playlist, downloads its segments under a
// process-wide concurrency cap with per-item retry, and hands the ordered
// segment files to assembly, transcoding, and tagging collaborators to
// produce one tagged audio file per program.

pub mod assemble;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod output;
pub mod program;
pub mod resolve;
pub mod retry;
pub mod scheduler;
pub mod tag;

pub use assemble::{Assembler, FfmpegAssembler, FfmpegTranscoder, Transcoder};
pub use config::{AudioFormat, RecorderConfig};
pub use downloader::BulkDownloader;
pub use error::EngineError;
pub use fetch::{HttpFetcher, SegmentFetcher};
pub use orchestrator::{FailureStage, Orchestrator, RetrievalOutcome};
pub use output::OutputTarget;
pub use program::{Program, ProgramId};
pub use resolve::{RequestSigner, TimeshiftClient, TimeshiftResolver};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use scheduler::BatchScheduler;
pub use tag::{LoftyTagger, TagFields, Tagger};
