use thiserror::Error;

/// Job-level failure taxonomy.
///
/// Soft adapter results (no detections, no embedding for a box) are not
/// errors; they degrade the identity decision instead. Everything here is
/// fatal for the job that raised it.
#[derive(Error, Debug)]
pub enum RedactionError {
    /// Reference embedding set is empty or dimensionally inconsistent.
    /// Raised at job setup, before any frame is processed.
    #[error("invalid reference embeddings: {0}")]
    InvalidReference(String),

    /// Source could not be read or the output encoder failed.
    #[error("video I/O failure: {0}")]
    VideoIo(String),

    /// A detection or embedding adapter failed hard (not a soft miss).
    #[error("adapter failure: {0}")]
    Adapter(String),

    /// Audio re-mux of the finished video stream failed.
    #[error("audio remux failed: {0}")]
    Remux(String),
}

impl RedactionError {
    pub fn video_io(err: impl std::fmt::Display) -> Self {
        Self::VideoIo(err.to_string())
    }

    pub fn adapter(err: impl std::fmt::Display) -> Self {
        Self::Adapter(err.to_string())
    }
}
