use thiserror::Error;

/// Errors raised while negotiating, demultiplexing or analyzing an MJPEG stream.
///
/// Everything except [`JitterError::NoFramesObserved`] and
/// [`JitterError::NoElapsedTime`] is fatal for a run. Those two only come out
/// of [`RunningStats::summary`](crate::stats::RunningStats::summary) and are
/// reported as "no data" by the finalizer.
#[derive(Debug, Error)]
pub enum JitterError {
    #[error("document content-type is '{0}', not 'multipart/x-mixed-replace'")]
    UnsupportedMediaType(String),

    #[error("no boundary parameter declared in content-type '{0}'")]
    MissingBoundary(String),

    #[error("no frame content-length provided")]
    MissingFrameLength,

    #[error("frame content-length '{0}' is not an integer")]
    InvalidFrameLength(String),

    #[error("stream truncated {0}")]
    TruncatedStream(String),

    #[error("no frames observed")]
    NoFramesObserved,

    #[error("{0} frames observed without measurable time between them")]
    NoElapsedTime(u64),

    #[error("invalid timing entry '{value}' on line {line}")]
    InvalidTiming { line: usize, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, JitterError>;
