use ndarray::Array1;

use crate::shared::bbox::BBox;
use crate::shared::frame::Frame;

/// Domain interface for per-face embedding extraction.
///
/// `embed` crops the face at `bbox` out of `frame` and returns an
/// L2-normalized embedding vector. `Ok(None)` means the crop was
/// degenerate (empty after clamping); hard inference failures are
/// surfaced as errors.
pub trait FaceEmbedder: Send {
    fn embed(
        &mut self,
        frame: &Frame,
        bbox: &BBox,
    ) -> Result<Option<Array1<f32>>, Box<dyn std::error::Error>>;
}
