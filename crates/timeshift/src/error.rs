use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("retrieval cancelled")]
    Cancelled,

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} during {operation} for {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("playlist error: {source}")]
    Chunklist {
        #[from]
        source: chunklist::ChunklistError,
    },

    #[error("{failed} of {total} segments failed to download")]
    SegmentsIncomplete { failed: usize, total: usize },

    #[error("assembly error: {reason}")]
    Assembly { reason: String },

    #[error("transcode error: {reason}")]
    Transcode { reason: String },

    #[error("tagging error: {reason}")]
    Tagging { reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("invalid start time `{input}`: {reason}")]
    InvalidStartTime { input: String, reason: String },
}

impl EngineError {
    pub fn http_status(
        status: StatusCode,
        url: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            operation,
        }
    }

    pub fn assembly(reason: impl Into<String>) -> Self {
        Self::Assembly {
            reason: reason.into(),
        }
    }

    pub fn transcode(reason: impl Into<String>) -> Self {
        Self::Transcode {
            reason: reason.into(),
        }
    }

    pub fn tagging(reason: impl Into<String>) -> Self {
        Self::Tagging {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Whether a retry with the same inputs can plausibly succeed.
    ///
    /// Network and I/O failures are transient. Authorization rejections from
    /// the time-shift endpoint are counted as transient too, since tokens
    /// expire and are re-acquired on the next attempt. Parse and
    /// configuration failures are deterministic and never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled
            | Self::Chunklist { .. }
            | Self::Configuration { .. }
            | Self::InvalidStartTime { .. }
            | Self::Assembly { .. }
            | Self::Transcode { .. }
            | Self::Tagging { .. } => false,
            Self::Network { .. }
            | Self::HttpStatus { .. }
            | Self::Io { .. }
            | Self::SegmentsIncomplete { .. } => true,
        }
    }
}
