use thiserror::Error;

/// Crate-wide error type.
///
/// Only user-visible rejections and recoverable-empty outcomes are modeled as
/// errors. Network failures never surface here: size probes resolve to the
/// `0` sentinel and manifest fetches fail open to a default stream.
#[derive(Debug, Error)]
pub enum StreamgrabError {
    #[error("No playback URL available")]
    NoPlaybackUrl,

    #[error("No streams available")]
    NoStreams,

    #[error("Download queue is empty")]
    EmptyQueue,

    #[error("Already in queue: {0}")]
    DuplicateQueued(String),

    #[error("No queue item at index {0}")]
    InvalidQueueIndex(usize),

    #[error("External handler refused: {0}")]
    DispatchRejected(String),
}

pub type Result<T> = std::result::Result<T, StreamgrabError>;
