use crate::identity::classifier::{IdentityClassifier, Observation};
use crate::shared::bbox::BBox;
use crate::tracking::matcher;
use crate::tracking::track::Track;

/// Per-frame labeling result: how many tracked faces were preserved and
/// which boxes must be blurred before the frame is written.
#[derive(Clone, Debug, Default)]
pub struct FrameOutcome {
    pub preserved: usize,
    pub redacted: Vec<BBox>,
}

impl FrameOutcome {
    fn record(&mut self, track: &Track) {
        if track.is_preserved() {
            self.preserved += 1;
        } else {
            self.redacted.push(track.bbox);
        }
    }
}

/// The set of live tracks, advanced one frame at a time.
///
/// Every update builds the next generation of tracks from the previous
/// one instead of mutating the list while iterating, so matching and
/// aging can never observe a half-updated table.
#[derive(Default)]
pub struct TrackTable {
    tracks: Vec<Track>,
}

impl TrackTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Detection frame with at least one observation: match detections
    /// to tracks, refresh the matched ones, spawn tracks for the rest,
    /// and age the leftovers.
    pub fn advance(
        &mut self,
        observations: &[Observation],
        classifier: &IdentityClassifier,
        frame_width: u32,
        frame_height: u32,
    ) -> FrameOutcome {
        let track_boxes: Vec<BBox> = self.tracks.iter().map(|t| t.bbox).collect();
        let detection_boxes: Vec<BBox> = observations.iter().map(|o| o.bbox).collect();
        let assignments = matcher::assign(
            &track_boxes,
            &detection_boxes,
            classifier.profile().track_match_threshold,
        );

        let mut previous: Vec<Option<Track>> = self.tracks.drain(..).map(Some).collect();
        let mut next = Vec::with_capacity(observations.len() + previous.len());
        let mut outcome = FrameOutcome::default();

        for (observation, assignment) in observations.iter().zip(&assignments) {
            let track = match assignment.and_then(|idx| previous[idx].take()) {
                Some(mut track) => {
                    track.bbox = track
                        .bbox
                        .midpoint(&observation.bbox)
                        .clamped(frame_width, frame_height);
                    track.ttl = classifier.profile().track_ttl;
                    classifier.update_matched(&mut track, observation);
                    track
                }
                None => classifier.create_track(observation),
            };
            outcome.record(&track);
            next.push(track);
        }

        for mut track in previous.into_iter().flatten() {
            track.ttl = track.ttl.saturating_sub(1);
            if track.ttl == 0 {
                continue;
            }
            track.bbox = track.bbox.clamped(frame_width, frame_height);
            classifier.age_unmatched(&mut track);
            outcome.record(&track);
            next.push(track);
        }

        self.tracks = next;
        outcome
    }

    /// Detection frame that found nothing: every track ages as a
    /// rejection. A track whose ttl reaches zero is composited one last
    /// time before it is dropped.
    pub fn decay(
        &mut self,
        classifier: &IdentityClassifier,
        frame_width: u32,
        frame_height: u32,
    ) -> FrameOutcome {
        let mut next = Vec::with_capacity(self.tracks.len());
        let mut outcome = FrameOutcome::default();
        for mut track in self.tracks.drain(..) {
            track.ttl = track.ttl.saturating_sub(1);
            track.bbox = track.bbox.clamped(frame_width, frame_height);
            classifier.age_unmatched(&mut track);
            outcome.record(&track);
            if track.ttl > 0 {
                next.push(track);
            }
        }
        self.tracks = next;
        outcome
    }

    /// Skipped frame: a single ttl tick, labels and counters untouched.
    pub fn tick(&mut self, frame_width: u32, frame_height: u32) -> FrameOutcome {
        let mut next = Vec::with_capacity(self.tracks.len());
        let mut outcome = FrameOutcome::default();
        for mut track in self.tracks.drain(..) {
            track.ttl = track.ttl.saturating_sub(1);
            if track.ttl == 0 {
                continue;
            }
            track.bbox = track.bbox.clamped(frame_width, frame_height);
            outcome.record(&track);
            next.push(track);
        }
        self.tracks = next;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::reference::ReferenceEmbeddingSet;
    use crate::profile::{ModeProfile, QualityMode};
    use crate::tracking::track::TrackLabel;
    use ndarray::{arr1, Array1};

    fn classifier() -> IdentityClassifier {
        let mut v = vec![0.0f32; 8];
        v[0] = 1.0;
        IdentityClassifier::new(
            ModeProfile::for_mode(QualityMode::Fast),
            ReferenceEmbeddingSet::new(vec![v]).unwrap(),
        )
    }

    fn subject_embedding() -> Array1<f32> {
        let mut v = vec![0.0f32; 8];
        v[0] = 1.0;
        arr1(&v)
    }

    fn stranger_embedding() -> Array1<f32> {
        let mut v = vec![0.0f32; 8];
        v[1] = 1.0;
        arr1(&v)
    }

    fn obs(x: i32, y: i32, embedding: Option<Array1<f32>>) -> Observation {
        Observation {
            bbox: BBox::new(x, y, 60, 60),
            embedding,
        }
    }

    #[test]
    fn test_advance_spawns_and_labels_tracks() {
        let c = classifier();
        let mut table = TrackTable::new();
        let outcome = table.advance(
            &[
                obs(10, 10, Some(subject_embedding())),
                obs(200, 10, Some(stranger_embedding())),
            ],
            &c,
            640,
            480,
        );
        assert_eq!(table.len(), 2);
        assert_eq!(outcome.preserved, 1);
        assert_eq!(outcome.redacted, vec![BBox::new(200, 10, 60, 60)]);
    }

    #[test]
    fn test_advance_matches_moving_detection() {
        let c = classifier();
        let mut table = TrackTable::new();
        table.advance(&[obs(10, 10, Some(subject_embedding()))], &c, 640, 480);
        // Shifted slightly: still the same track, box blended toward it.
        table.advance(&[obs(14, 10, Some(subject_embedding()))], &c, 640, 480);
        assert_eq!(table.len(), 1);
        assert_eq!(table.tracks()[0].bbox, BBox::new(12, 10, 60, 60));
        assert_eq!(table.tracks()[0].ttl, c.profile().track_ttl);
    }

    #[test]
    fn test_advance_one_track_claimed_once() {
        let c = classifier();
        let mut table = TrackTable::new();
        table.advance(&[obs(10, 10, Some(subject_embedding()))], &c, 640, 480);
        // Two overlapping detections: the second must spawn a new track.
        table.advance(
            &[
                obs(12, 10, Some(subject_embedding())),
                obs(16, 12, Some(stranger_embedding())),
            ],
            &c,
            640,
            480,
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_unmatched_track_expires_after_ttl() {
        let c = classifier();
        let mut table = TrackTable::new();
        table.advance(&[obs(10, 10, Some(subject_embedding()))], &c, 640, 480);
        let ttl = c.profile().track_ttl;
        for _ in 0..ttl {
            table.advance(&[obs(500, 400, Some(stranger_embedding()))], &c, 640, 480);
        }
        // Only the stranger's track survives.
        assert_eq!(table.len(), 1);
        assert_eq!(table.tracks()[0].label, TrackLabel::Redacted);
    }

    #[test]
    fn test_decay_ages_and_eventually_clears() {
        let c = classifier();
        let mut table = TrackTable::new();
        table.advance(&[obs(10, 10, Some(subject_embedding()))], &c, 640, 480);
        let ttl = c.profile().track_ttl;
        let mut last = FrameOutcome::default();
        for _ in 0..ttl {
            last = table.decay(&c, 640, 480);
        }
        assert!(table.is_empty());
        // The final decay still composited the (by then demoted) track.
        assert_eq!(last.preserved + last.redacted.len(), 1);
    }

    #[test]
    fn test_decay_demotes_preserved_track() {
        let c = classifier();
        let mut table = TrackTable::new();
        table.advance(&[obs(10, 10, Some(subject_embedding()))], &c, 640, 480);
        for _ in 0..c.profile().demote_misses {
            table.decay(&c, 640, 480);
        }
        assert_eq!(table.tracks()[0].label, TrackLabel::Redacted);
    }

    #[test]
    fn test_tick_keeps_labels_and_counters() {
        let c = classifier();
        let mut table = TrackTable::new();
        table.advance(&[obs(10, 10, Some(subject_embedding()))], &c, 640, 480);
        let before = table.tracks()[0].clone();
        let outcome = table.tick(640, 480);
        let after = &table.tracks()[0];
        assert_eq!(after.label, before.label);
        assert_eq!(after.hits, before.hits);
        assert_eq!(after.misses, before.misses);
        assert_eq!(after.ttl, before.ttl - 1);
        assert_eq!(outcome.preserved, 1);
    }

    #[test]
    fn test_tick_drops_expired_without_compositing() {
        let c = classifier();
        let mut table = TrackTable::new();
        table.advance(&[obs(200, 10, Some(stranger_embedding()))], &c, 640, 480);
        let ttl = c.profile().track_ttl;
        for _ in 0..ttl - 1 {
            let outcome = table.tick(640, 480);
            assert_eq!(outcome.redacted.len(), 1);
        }
        let last = table.tick(640, 480);
        assert!(table.is_empty());
        assert!(last.redacted.is_empty());
    }

    #[test]
    fn test_reacquired_track_keeps_identity_state() {
        let c = classifier();
        let mut table = TrackTable::new();
        table.advance(&[obs(10, 10, Some(subject_embedding()))], &c, 640, 480);
        table.tick(640, 480);
        table.tick(640, 480);
        // Detected again near the old position: same track refreshed.
        let outcome = table.advance(&[obs(12, 12, Some(subject_embedding()))], &c, 640, 480);
        assert_eq!(table.len(), 1);
        assert_eq!(outcome.preserved, 1);
        assert_eq!(table.tracks()[0].ttl, c.profile().track_ttl);
    }
}
