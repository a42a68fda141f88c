use std::path::Path;

use crate::detection::domain::face_detector::{FaceBox, FaceDetector};
use crate::shared::bbox::BBox;
use crate::shared::frame::Frame;

/// Model input edge length.
const INPUT_SIZE: u32 = 128;

/// Overlap above which a lower-scored candidate is suppressed.
const SUPPRESSION_IOU: f64 = 0.3;

/// Anchor count for the short-range model: 16x16 cells with 2 anchors
/// plus 8x8 cells with 6 anchors.
const ANCHOR_COUNT: usize = 896;

/// Short-range BlazeFace detector on an ONNX Runtime session.
///
/// Cheap enough to run on every detection frame; boxes come back in the
/// coordinates of the frame handed to [`detect`](FaceDetector::detect).
pub struct OnnxFaceDetector {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxFaceDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;
        Ok(Self {
            session,
            confidence,
            anchors: anchor_centers(),
        })
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let input = ort::value::Tensor::from_array(to_model_input(frame))?;
        let outputs = self.session.run(ort::inputs![input])?;

        // Output 0 holds per-anchor box deltas ([1, 896, 16], the tail
        // being keypoints we ignore); output 1 the raw logits ([1, 896, 1]).
        if outputs.len() < 2 {
            return Err(format!("detector produced {} outputs, expected 2", outputs.len()).into());
        }
        let deltas = outputs[0].try_extract_array::<f32>()?;
        let logits = outputs[1].try_extract_array::<f32>()?;
        let deltas = deltas
            .as_slice()
            .ok_or("detector deltas are not contiguous")?;
        let logits = logits
            .as_slice()
            .ok_or("detector logits are not contiguous")?;

        let mut candidates = self.decode(deltas, logits, frame.width(), frame.height());
        suppress_overlaps(&mut candidates);

        let fw = frame.width() as i32;
        let fh = frame.height() as i32;
        Ok(candidates
            .into_iter()
            .map(|c| {
                let x = c.left as i32;
                let y = c.top as i32;
                FaceBox {
                    bbox: BBox::new(
                        x,
                        y,
                        ((c.right - c.left) as i32).min(fw - x),
                        ((c.bottom - c.top) as i32).min(fh - y),
                    ),
                    confidence: c.score,
                }
            })
            .collect())
    }
}

impl OnnxFaceDetector {
    /// Turn anchor-relative deltas into frame-space corner boxes for
    /// every anchor whose sigmoid score clears the threshold.
    fn decode(&self, deltas: &[f32], logits: &[f32], fw: u32, fh: u32) -> Vec<Candidate> {
        let mut out = Vec::new();
        let count = self.anchors.len().min(ANCHOR_COUNT).min(logits.len());

        for i in 0..count {
            let score = sigmoid(logits[i]) as f64;
            if score < self.confidence {
                continue;
            }
            let at = i * 16;
            if at + 4 > deltas.len() {
                break;
            }

            let [ax, ay] = self.anchors[i];
            let cx = ax + deltas[at] / INPUT_SIZE as f32;
            let cy = ay + deltas[at + 1] / INPUT_SIZE as f32;
            let half_w = deltas[at + 2] / INPUT_SIZE as f32 / 2.0;
            let half_h = deltas[at + 3] / INPUT_SIZE as f32 / 2.0;

            out.push(Candidate {
                left: (((cx - half_w) * fw as f32).max(0.0)) as f64,
                top: (((cy - half_h) * fh as f32).max(0.0)) as f64,
                right: (((cx + half_w) * fw as f32).min(fw as f32)) as f64,
                bottom: (((cy + half_h) * fh as f32).min(fh as f32)) as f64,
                score,
            });
        }
        out
    }
}

/// Nearest-neighbor resize to the model edge, scaled to [0,1], NCHW.
fn to_model_input(frame: &Frame) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let (sh, sw) = (frame.height() as usize, frame.width() as usize);
    let edge = INPUT_SIZE as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, edge, edge));
    for y in 0..edge {
        let sy = (((y as f64 + 0.5) * sh as f64 / edge as f64) as usize).min(sh - 1);
        for x in 0..edge {
            let sx = (((x as f64 + 0.5) * sw as f64 / edge as f64) as usize).min(sw - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[sy, sx, c]] as f32 / 255.0;
            }
        }
    }
    tensor
}

/// Anchor center coordinates in the unit square, matching the model's
/// two feature-map levels.
fn anchor_centers() -> Vec<[f32; 2]> {
    let mut centers = Vec::with_capacity(ANCHOR_COUNT);
    for (stride, per_cell) in [(8usize, 2usize), (16, 6)] {
        let cells = INPUT_SIZE as usize / stride;
        for y in 0..cells {
            for x in 0..cells {
                let center = [
                    (x as f32 + 0.5) / cells as f32,
                    (y as f32 + 0.5) / cells as f32,
                ];
                centers.extend(std::iter::repeat(center).take(per_cell));
            }
        }
    }
    centers
}

#[derive(Clone, Debug)]
struct Candidate {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    score: f64,
}

impl Candidate {
    fn area(&self) -> f64 {
        (self.right - self.left) * (self.bottom - self.top)
    }

    fn overlap(&self, other: &Candidate) -> f64 {
        let w = (self.right.min(other.right) - self.left.max(other.left)).max(0.0);
        let h = (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0.0);
        let intersection = w * h;
        if intersection == 0.0 {
            return 0.0;
        }
        intersection / (self.area() + other.area() - intersection)
    }
}

/// Greedy non-maximum suppression: keep the best-scored candidate,
/// drop everything overlapping it past the threshold, repeat.
fn suppress_overlaps(candidates: &mut Vec<Candidate>) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates.drain(..) {
        if kept.iter().all(|k| k.overlap(&candidate) <= SUPPRESSION_IOU) {
            kept.push(candidate);
        }
    }
    *candidates = kept;
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(left: f64, top: f64, size: f64, score: f64) -> Candidate {
        Candidate {
            left,
            top,
            right: left + size,
            bottom: top + size,
            score,
        }
    }

    #[test]
    fn test_model_input_is_nchw_unit_scaled() {
        let frame = Frame::new(vec![255u8; 64 * 48 * 3], 64, 48, 3, 0);
        let tensor = to_model_input(&frame);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
        assert!((tensor[[0, 2, 60, 60]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_anchor_layout() {
        let centers = anchor_centers();
        assert_eq!(centers.len(), ANCHOR_COUNT);
        assert!(centers
            .iter()
            .all(|c| (0.0..1.0).contains(&c[0]) && (0.0..1.0).contains(&c[1])));
        // First cell of the 16x16 level repeats its center twice.
        assert_eq!(centers[0], centers[1]);
    }

    #[test]
    fn test_sigmoid_midpoint_and_tails() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(12.0) > 0.999);
        assert!(sigmoid(-12.0) < 0.001);
    }

    #[test]
    fn test_suppression_drops_duplicate() {
        let mut candidates = vec![
            candidate(0.0, 0.0, 100.0, 0.9),
            candidate(4.0, 4.0, 100.0, 0.6),
        ];
        suppress_overlaps(&mut candidates);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].score, 0.9);
    }

    #[test]
    fn test_suppression_keeps_disjoint_faces() {
        let mut candidates = vec![
            candidate(0.0, 0.0, 40.0, 0.9),
            candidate(300.0, 10.0, 40.0, 0.7),
            candidate(10.0, 300.0, 40.0, 0.8),
        ];
        suppress_overlaps(&mut candidates);
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn test_suppression_orders_by_score() {
        let mut candidates = vec![
            candidate(300.0, 10.0, 40.0, 0.6),
            candidate(0.0, 0.0, 40.0, 0.95),
        ];
        suppress_overlaps(&mut candidates);
        assert_eq!(candidates[0].score, 0.95);
    }

    #[test]
    fn test_overlap_of_identical_boxes_is_one() {
        let a = candidate(10.0, 10.0, 50.0, 0.5);
        assert!((a.overlap(&a.clone()) - 1.0).abs() < 1e-9);
    }
}
