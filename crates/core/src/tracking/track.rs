use ndarray::Array1;

use crate::shared::bbox::BBox;

/// Per-face identity decision carried across frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackLabel {
    /// Matches the registered subject: left untouched.
    Preserved,
    /// Unknown face: blurred.
    Redacted,
}

/// One physical face followed across consecutive frames.
///
/// Owned exclusively by the [`TrackTable`](crate::tracking::TrackTable);
/// each generation of tracks is built fresh from the previous one, so a
/// track is mutated at most once per processed frame.
#[derive(Clone, Debug)]
pub struct Track {
    /// Blend-smoothed box, always clamped to frame bounds.
    pub bbox: BBox,
    pub label: TrackLabel,
    /// Frames left to live without a matching detection.
    pub ttl: u32,
    /// Exponentially blended distance to the reference set.
    pub blended_distance: f64,
    /// Consecutive acceptance counter, capped at `promote_hits`.
    pub hits: u32,
    /// Strong-miss counter, capped at `demote_misses`.
    pub misses: u32,
    /// Exponentially smoothed embedding; `None` until the first
    /// successful per-box embedding.
    pub running_embedding: Option<Array1<f32>>,
}

impl Track {
    pub fn is_preserved(&self) -> bool {
        self.label == TrackLabel::Preserved
    }

    /// Fold a new reference distance into the blended estimate.
    /// Non-finite observations (embedding failures) leave it unchanged.
    pub fn record_distance(&mut self, new: f64) {
        if !new.is_finite() {
            return;
        }
        if self.blended_distance.is_finite() {
            self.blended_distance = self.blended_distance * 0.6 + new * 0.4;
        } else {
            self.blended_distance = new;
        }
    }
}
