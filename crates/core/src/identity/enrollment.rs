use log::info;

use crate::detection::domain::{FaceDetector, FaceEmbedder};
use crate::error::RedactionError;
use crate::identity::reference::ReferenceEmbeddingSet;
use crate::shared::bbox::BBox;
use crate::shared::frame::Frame;

/// Padding added around the most prominent face before embedding, as a
/// fraction of the box size on each side.
const ENROLL_PADDING_RATIO: f64 = 0.08;

/// Extract one reference embedding per enrollment photo.
///
/// Each photo must contain at least one detectable face; the largest
/// one is taken as the subject. Fails with [`RedactionError::InvalidReference`]
/// when a photo yields no usable face.
pub fn enroll(
    photos: &[Frame],
    detector: &mut dyn FaceDetector,
    embedder: &mut dyn FaceEmbedder,
) -> Result<ReferenceEmbeddingSet, RedactionError> {
    if photos.is_empty() {
        return Err(RedactionError::InvalidReference(
            "no enrollment photos provided".into(),
        ));
    }
    let mut embeddings = Vec::with_capacity(photos.len());
    for (index, photo) in photos.iter().enumerate() {
        let embedding = enroll_one(photo, detector, embedder).map_err(|e| {
            RedactionError::InvalidReference(format!("photo {}: {e}", index + 1))
        })?;
        embeddings.push(embedding);
    }
    info!("enrolled {} reference embedding(s)", embeddings.len());
    ReferenceEmbeddingSet::new(embeddings)
}

fn enroll_one(
    photo: &Frame,
    detector: &mut dyn FaceDetector,
    embedder: &mut dyn FaceEmbedder,
) -> Result<Vec<f32>, RedactionError> {
    let faces = detector.detect(photo).map_err(RedactionError::adapter)?;
    let largest = faces
        .iter()
        .max_by_key(|f| i64::from(f.bbox.width) * i64::from(f.bbox.height))
        .ok_or_else(|| RedactionError::InvalidReference("no face found".into()))?;

    let padded = pad_box(&largest.bbox, photo.width(), photo.height());
    let embedding = embedder
        .embed(photo, &padded)
        .map_err(RedactionError::adapter)?
        .ok_or_else(|| {
            RedactionError::InvalidReference("face crop was unusable".into())
        })?;
    Ok(embedding.to_vec())
}

fn pad_box(bbox: &BBox, frame_width: u32, frame_height: u32) -> BBox {
    let pad_w = (f64::from(bbox.width) * ENROLL_PADDING_RATIO).round() as i32;
    let pad_h = (f64::from(bbox.height) * ENROLL_PADDING_RATIO).round() as i32;
    BBox::new(
        bbox.x - pad_w,
        bbox.y - pad_h,
        bbox.width + pad_w * 2,
        bbox.height + pad_h * 2,
    )
    .clamped(frame_width, frame_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::FaceBox;
    use ndarray::{arr1, Array1};

    struct StubDetector {
        faces: Vec<FaceBox>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            Ok(self.faces.clone())
        }
    }

    struct StubEmbedder {
        last_box: Option<BBox>,
    }

    impl FaceEmbedder for StubEmbedder {
        fn embed(
            &mut self,
            _frame: &Frame,
            bbox: &BBox,
        ) -> Result<Option<Array1<f32>>, Box<dyn std::error::Error>> {
            self.last_box = Some(*bbox);
            Ok(Some(arr1(&[1.0, 0.0, 0.0])))
        }
    }

    fn photo() -> Frame {
        Frame::new(vec![0u8; 100 * 100 * 3], 100, 100, 3, 0)
    }

    #[test]
    fn test_enroll_picks_largest_face() {
        let mut detector = StubDetector {
            faces: vec![
                FaceBox {
                    bbox: BBox::new(0, 0, 10, 10),
                    confidence: 0.9,
                },
                FaceBox {
                    bbox: BBox::new(30, 30, 50, 50),
                    confidence: 0.7,
                },
            ],
        };
        let mut embedder = StubEmbedder { last_box: None };
        let set = enroll(&[photo()], &mut detector, &mut embedder).unwrap();
        assert_eq!(set.len(), 1);
        // The larger box gets padded by 8% on each side.
        let used = embedder.last_box.unwrap();
        assert_eq!(used, BBox::new(26, 26, 58, 58));
    }

    #[test]
    fn test_enroll_no_face_is_invalid_reference() {
        let mut detector = StubDetector { faces: vec![] };
        let mut embedder = StubEmbedder { last_box: None };
        let err = enroll(&[photo()], &mut detector, &mut embedder).unwrap_err();
        assert!(matches!(err, RedactionError::InvalidReference(_)));
    }

    #[test]
    fn test_enroll_empty_photo_list_rejected() {
        let mut detector = StubDetector { faces: vec![] };
        let mut embedder = StubEmbedder { last_box: None };
        let err = enroll(&[], &mut detector, &mut embedder).unwrap_err();
        assert!(matches!(err, RedactionError::InvalidReference(_)));
    }

    #[test]
    fn test_padding_clamped_to_frame() {
        let padded = pad_box(&BBox::new(0, 0, 50, 50), 100, 100);
        // Origin clamps back to zero, the padded size still fits.
        assert_eq!(padded, BBox::new(0, 0, 58, 58));
    }
}
