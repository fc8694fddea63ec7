use std::time::Duration;

/// Every way a thumbnail request can fail.
///
/// The `Display` output is the human-readable message served to clients,
/// so keep it free of internal detail that is not useful to a caller.
#[derive(Debug, thiserror::Error)]
pub enum ThumbError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("cannot read video source {uri}: {reason}")]
    SourceUnreadable { uri: String, reason: String },

    #[error("malformed video source: frame count {frame_count}, fps {fps}")]
    MalformedSource { frame_count: u64, fps: f64 },

    #[error("this video duration is {duration_ms:.3}ms, but you need {requested_ms:.3}ms")]
    FrameUnavailable { duration_ms: f64, requested_ms: f64 },

    #[error("failed to encode thumbnail: {0}")]
    EncodingFailed(String),

    /// Write-through to the cache failed. Recoverable: the pipeline logs it
    /// and still serves the freshly rendered image.
    #[error("failed to persist thumbnail at {path}: {reason}")]
    CachePersistFailed { path: String, reason: String },

    #[error("storage error at {path}: {source}")]
    StorageFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("thumbnail generation exceeded the {}s deadline", .0.as_secs_f64())]
    DeadlineExceeded(Duration),
}

impl ThumbError {
    /// Whether the caller is at fault (as opposed to the source or server).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::BadRequest(_))
    }
}
