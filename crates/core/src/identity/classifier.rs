use log::debug;
use ndarray::Array1;

use crate::identity::reference::ReferenceEmbeddingSet;
use crate::profile::ModeProfile;
use crate::shared::bbox::BBox;
use crate::tracking::track::{Track, TrackLabel};

/// A detected face with its (possibly failed) embedding, ready for an
/// identity decision.
#[derive(Clone, Debug)]
pub struct Observation {
    pub bbox: BBox,
    pub embedding: Option<Array1<f32>>,
}

/// Raw verdict of a single embedding against the reference set, before
/// any per-track smoothing or hysteresis is applied.
#[derive(Clone, Copy, Debug)]
struct EmbeddingJudgement {
    distance: f64,
    reference_ok: bool,
    /// Within the widened acceptance window *and* unambiguous
    /// (confidence gap above the profile floor).
    window_ok: bool,
    /// Far enough out (or missing) to count against hysteresis.
    strong_miss: bool,
}

/// Decides, per frame, whether a track still looks like the registered
/// subject. All thresholds come from the [`ModeProfile`]; the classifier
/// itself is stateless, per-track state lives on the [`Track`].
pub struct IdentityClassifier {
    profile: ModeProfile,
    references: ReferenceEmbeddingSet,
}

impl IdentityClassifier {
    pub fn new(profile: ModeProfile, references: ReferenceEmbeddingSet) -> Self {
        Self { profile, references }
    }

    pub fn profile(&self) -> &ModeProfile {
        &self.profile
    }

    fn judge(&self, embedding: Option<&Array1<f32>>) -> EmbeddingJudgement {
        let Some(embedding) = embedding else {
            // A face we could not embed never counts as the subject.
            return EmbeddingJudgement {
                distance: f64::INFINITY,
                reference_ok: false,
                window_ok: false,
                strong_miss: true,
            };
        };
        let nearest = self.references.nearest(embedding.view());
        let confident = nearest.confidence_gap >= self.profile.min_confidence_gap;
        let threshold = self.profile.match_threshold;
        let margin = self.profile.demotion_margin;
        EmbeddingJudgement {
            distance: nearest.distance,
            reference_ok: nearest.distance <= threshold,
            window_ok: confident && nearest.distance <= threshold + margin * 0.25,
            strong_miss: nearest.distance > threshold + margin * 0.6,
        }
    }

    /// Fold a fresh observation into a track that was matched by IoU.
    ///
    /// Updates the running embedding, acceptance counters and label; the
    /// box itself is blended by the track table, not here.
    pub fn update_matched(&self, track: &mut Track, observation: &Observation) {
        let judgement = self.judge(observation.embedding.as_ref());

        let mut running_distance = f64::INFINITY;
        let mut running_ok = false;
        if let Some(embedding) = &observation.embedding {
            if let Some(running) = &track.running_embedding {
                running_distance = euclidean(running, embedding);
            }
            let alpha = self.profile.embedding_smooth_alpha;
            track.running_embedding = Some(match track.running_embedding.take() {
                None => embedding.clone(),
                Some(running) => {
                    running.mapv(|v| v * alpha) + embedding.mapv(|v| v * (1.0 - alpha))
                }
            });
            let factor = if self.profile.require_reference_match {
                0.8
            } else {
                0.9
            };
            running_ok = running_distance.is_finite()
                && running_distance <= self.profile.match_threshold * factor;
        }
        // Deliberately checked after the seed above: on the frame the
        // running estimate is first seeded, strict mode already demands
        // agreement with it, which the seed trivially fails to witness.
        let running_ready = track.running_embedding.is_some();

        let (accepted, strong_miss) = if self.profile.require_reference_match {
            let accepted = judgement.reference_ok && (!running_ready || running_ok);
            let strong = !accepted && (!judgement.reference_ok || (running_ready && !running_ok));
            (accepted, strong)
        } else if judgement.reference_ok || (judgement.window_ok && running_ok) {
            (true, false)
        } else {
            (
                false,
                judgement.strong_miss || (!running_ok && !judgement.reference_ok),
            )
        };

        track.record_distance(judgement.distance);
        if accepted {
            track.hits = (track.hits + 1).min(self.profile.promote_hits);
            track.misses = track.misses.saturating_sub(1);
        } else {
            track.hits = 0;
            if strong_miss {
                track.misses = (track.misses + 1).min(self.profile.demote_misses);
            }
        }
        if strong_miss
            && track.label == TrackLabel::Preserved
            && track.misses >= self.profile.demote_misses
        {
            debug!(
                "demoting track after {} strong misses (distance={:.3})",
                track.misses, judgement.distance
            );
            track.label = TrackLabel::Redacted;
        }
    }

    /// Seed a track for a detection no existing track claimed.
    pub fn create_track(&self, observation: &Observation) -> Track {
        let judgement = self.judge(observation.embedding.as_ref());
        let accepted = if self.profile.require_reference_match {
            judgement.reference_ok
        } else {
            judgement.reference_ok || judgement.window_ok
        };
        let label = if accepted {
            TrackLabel::Preserved
        } else {
            TrackLabel::Redacted
        };
        debug!(
            "new track label={label:?} distance={:.3}",
            judgement.distance
        );
        Track {
            bbox: observation.bbox,
            label,
            ttl: self.profile.track_ttl,
            blended_distance: judgement.distance,
            hits: if accepted { 1 } else { 0 },
            misses: if accepted {
                0
            } else {
                u32::from(judgement.strong_miss)
            },
            running_embedding: observation.embedding.clone(),
        }
    }

    /// A track left without any detection this frame: treated exactly
    /// like a strong rejection, so prolonged absence demotes it.
    pub fn age_unmatched(&self, track: &mut Track) {
        track.hits = 0;
        track.misses = (track.misses + 1).min(self.profile.demote_misses);
        if track.label == TrackLabel::Preserved && track.misses >= self.profile.demote_misses {
            debug!("demoting undetected track after {} misses", track.misses);
            track.label = TrackLabel::Redacted;
        }
    }
}

fn euclidean(a: &Array1<f32>, b: &Array1<f32>) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(x - y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
