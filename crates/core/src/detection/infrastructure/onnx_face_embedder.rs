/// ArcFace embedding extractor using ONNX Runtime.
///
/// Crops the face region out of the frame, resizes to the model input,
/// and returns an L2-normalized embedding.
use std::path::Path;

use ndarray::Array1;

use crate::detection::domain::face_embedder::FaceEmbedder;
use crate::shared::bbox::BBox;
use crate::shared::frame::Frame;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxFaceEmbedder {
    session: ort::session::Session,
}

impl OnnxFaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_inter_threads(1)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(model_path)?;
        Ok(Self { session })
    }
}

impl FaceEmbedder for OnnxFaceEmbedder {
    fn embed(
        &mut self,
        frame: &Frame,
        bbox: &BBox,
    ) -> Result<Option<Array1<f32>>, Box<dyn std::error::Error>> {
        let Some(tensor) = preprocess_crop(frame, bbox) else {
            return Ok(None);
        };
        let outputs = self.session.run(ort::inputs![ort::value::Tensor::from_array(tensor)?])?;
        let raw = outputs[0].try_extract_array::<f32>()?;
        let mut vector = raw
            .as_slice()
            .ok_or("embedding output is not contiguous")?
            .to_vec();
        l2_normalize(&mut vector);
        Ok(Some(Array1::from_vec(vector)))
    }
}

/// Crop `bbox` out of the frame and resize to 112x112, normalized NCHW.
/// Returns `None` when the clamped crop is degenerate.
fn preprocess_crop(frame: &Frame, bbox: &BBox) -> Option<ndarray::Array4<f32>> {
    let clamped = bbox.clamped(frame.width(), frame.height());
    let crop_w = clamped.width as usize;
    let crop_h = clamped.height as usize;
    if crop_w < 2 || crop_h < 2 {
        return None;
    }
    let x0 = clamped.x as usize;
    let y0 = clamped.y as usize;

    let src = frame.as_ndarray();
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));

    for y in 0..INPUT_SIZE {
        let src_y =
            y0 + (((y as f64 + 0.5) * crop_h as f64 / INPUT_SIZE as f64) as usize).min(crop_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x = x0
                + (((x as f64 + 0.5) * crop_w as f64 / INPUT_SIZE as f64) as usize)
                    .min(crop_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }

    Some(tensor)
}

pub fn l2_normalize(v: &mut [f32]) {
    let magnitude = v.iter().fold(0.0f32, |acc, x| acc + x * x).sqrt();
    if magnitude > 0.0 {
        v.iter_mut().for_each(|x| *x /= magnitude);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_unit_norm() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0f32; 4];
        l2_normalize(&mut v);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_preprocess_crop_shape() {
        let frame = Frame::new(vec![200u8; 64 * 64 * 3], 64, 64, 3, 0);
        let tensor = preprocess_crop(&frame, &BBox::new(8, 8, 32, 32)).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, INPUT_SIZE, INPUT_SIZE]);
        // Uniform 200 maps to (200 - 127.5) / 127.5
        let expected = (200.0 - NORM_MEAN) / NORM_STD;
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_degenerate_crop_is_none() {
        let frame = Frame::new(vec![0u8; 64 * 64 * 3], 64, 64, 3, 0);
        assert!(preprocess_crop(&frame, &BBox::new(500, 500, 0, 0)).is_none());
    }
}
