use crate::shared::bbox::BBox;
use crate::shared::frame::Frame;

/// A single detected face with its detector confidence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub bbox: BBox,
    pub confidence: f64,
}

/// Domain interface for face detection.
///
/// Implementations may be stateful (e.g., per-session scratch buffers),
/// hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;
}
