use std::fs;
use std::path::Path;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::RedactionError;

/// The consenting subject's reference embeddings, one row per enrolled
/// photo. Built once at registration time and immutable for the job.
#[derive(Clone, Debug)]
pub struct ReferenceEmbeddingSet {
    matrix: Array2<f32>,
}

/// Distances from a query embedding to the reference set.
#[derive(Clone, Copy, Debug)]
pub struct ReferenceMatch {
    /// Euclidean distance to the nearest reference vector.
    pub distance: f64,
    /// Gap to the second-nearest reference; infinite with one reference.
    pub confidence_gap: f64,
}

impl ReferenceEmbeddingSet {
    /// Build from row vectors. Empty input or rows of differing dimension
    /// are rejected before any frame is touched.
    pub fn new(embeddings: Vec<Vec<f32>>) -> Result<Self, RedactionError> {
        if embeddings.is_empty() {
            return Err(RedactionError::InvalidReference(
                "no reference embeddings provided".into(),
            ));
        }
        let dim = embeddings[0].len();
        if dim == 0 {
            return Err(RedactionError::InvalidReference(
                "reference embeddings are zero-dimensional".into(),
            ));
        }
        if let Some((i, row)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != dim)
        {
            return Err(RedactionError::InvalidReference(format!(
                "embedding {i} has dimension {} but expected {dim}",
                row.len()
            )));
        }

        let rows = embeddings.len();
        let flat: Vec<f32> = embeddings.into_iter().flatten().collect();
        let matrix = Array2::from_shape_vec((rows, dim), flat)
            .map_err(|e| RedactionError::InvalidReference(e.to_string()))?;
        Ok(Self { matrix })
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }

    /// Nearest and second-nearest Euclidean distances for a query vector.
    ///
    /// A query of the wrong dimension cannot match anything and comes back
    /// as infinitely distant rather than failing the job.
    pub fn nearest(&self, query: ArrayView1<'_, f32>) -> ReferenceMatch {
        if query.len() != self.dim() {
            log::warn!(
                "embedding dimension {} does not match reference dimension {}",
                query.len(),
                self.dim()
            );
            return ReferenceMatch {
                distance: f64::INFINITY,
                confidence_gap: f64::INFINITY,
            };
        }

        let mut best = f64::INFINITY;
        let mut second = f64::INFINITY;
        for row in self.matrix.rows() {
            let sq: f64 = row
                .iter()
                .zip(query.iter())
                .map(|(a, b)| {
                    let d = (*a - *b) as f64;
                    d * d
                })
                .sum();
            if sq < best {
                second = best;
                best = sq;
            } else if sq < second {
                second = sq;
            }
        }

        let distance = best.sqrt();
        let confidence_gap = if self.len() > 1 {
            (second.sqrt() - distance).max(0.0)
        } else {
            f64::INFINITY
        };
        ReferenceMatch {
            distance,
            confidence_gap,
        }
    }
}

/// Serialized registration profile: the precomputed embeddings the job
/// receives instead of raw photos.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredProfile {
    pub embeddings: Vec<Vec<f32>>,
}

impl StoredProfile {
    pub fn load(path: &Path) -> Result<ReferenceEmbeddingSet, RedactionError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            RedactionError::InvalidReference(format!("cannot read {}: {e}", path.display()))
        })?;
        let profile: StoredProfile = serde_json::from_str(&raw).map_err(|e| {
            RedactionError::InvalidReference(format!("malformed profile {}: {e}", path.display()))
        })?;
        ReferenceEmbeddingSet::new(profile.embeddings)
    }

    pub fn save(references: &ReferenceEmbeddingSet, path: &Path) -> Result<(), RedactionError> {
        let profile = StoredProfile {
            embeddings: references
                .matrix
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
        };
        let json = serde_json::to_string(&profile)
            .map_err(|e| RedactionError::InvalidReference(e.to_string()))?;
        fs::write(path, json).map_err(|e| {
            RedactionError::InvalidReference(format!("cannot write {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_empty_set_rejected() {
        let err = ReferenceEmbeddingSet::new(vec![]).unwrap_err();
        assert!(err.to_string().contains("no reference embeddings"));
    }

    #[test]
    fn test_ragged_dimensions_rejected() {
        let err =
            ReferenceEmbeddingSet::new(vec![vec![1.0, 2.0], vec![1.0, 2.0, 3.0]]).unwrap_err();
        assert!(err.to_string().contains("dimension"));
    }

    #[test]
    fn test_zero_dimensional_rejected() {
        assert!(ReferenceEmbeddingSet::new(vec![vec![]]).is_err());
    }

    #[test]
    fn test_nearest_single_reference() {
        let refs = ReferenceEmbeddingSet::new(vec![vec![0.0, 0.0]]).unwrap();
        let m = refs.nearest(array![3.0_f32, 4.0].view());
        assert_relative_eq!(m.distance, 5.0);
        assert!(m.confidence_gap.is_infinite());
    }

    #[test]
    fn test_nearest_picks_minimum_and_gap() {
        let refs = ReferenceEmbeddingSet::new(vec![vec![0.0, 0.0], vec![10.0, 0.0]]).unwrap();
        let m = refs.nearest(array![1.0_f32, 0.0].view());
        assert_relative_eq!(m.distance, 1.0);
        assert_relative_eq!(m.confidence_gap, 8.0);
    }

    #[test]
    fn test_gap_never_negative() {
        let refs = ReferenceEmbeddingSet::new(vec![vec![1.0, 0.0], vec![1.0, 0.0]]).unwrap();
        let m = refs.nearest(array![0.0_f32, 0.0].view());
        assert_relative_eq!(m.confidence_gap, 0.0);
    }

    #[test]
    fn test_dimension_mismatch_is_infinitely_distant() {
        let refs = ReferenceEmbeddingSet::new(vec![vec![0.0, 0.0]]).unwrap();
        let m = refs.nearest(array![1.0_f32, 2.0, 3.0].view());
        assert!(m.distance.is_infinite());
    }

    #[test]
    fn test_stored_profile_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("profile.json");

        let refs = ReferenceEmbeddingSet::new(vec![vec![0.5, -1.0], vec![2.0, 3.0]]).unwrap();
        StoredProfile::save(&refs, &path).unwrap();

        let loaded = StoredProfile::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dim(), 2);
        let m = loaded.nearest(array![0.5_f32, -1.0].view());
        assert_relative_eq!(m.distance, 0.0);
    }

    #[test]
    fn test_stored_profile_malformed_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(StoredProfile::load(&path).is_err());
    }

    #[test]
    fn test_stored_profile_empty_embeddings_rejected_on_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("empty.json");
        std::fs::write(&path, r#"{"embeddings": []}"#).unwrap();
        assert!(StoredProfile::load(&path).is_err());
    }
}
