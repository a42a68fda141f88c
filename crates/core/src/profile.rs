/// Per-job tuning parameters, fixed at job start.
///
/// A profile is selected once from a [`QualityMode`] and never mutated
/// afterwards; every component of the engine reads from the same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualityMode {
    /// Lower latency: detection every other frame, strict per-frame
    /// reference re-confirmation to compensate for sparser evidence.
    Fast,
    /// Higher fidelity: detection every frame, relaxed acceptance backed
    /// by the running identity estimate.
    Detailed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModeProfile {
    /// Run full detection/classification every Nth frame.
    pub detection_stride: usize,
    /// Downscale frames to this width before detection, if wider.
    pub detection_width: Option<u32>,
    /// Minimum detector confidence for a box to be considered.
    pub detector_confidence: f64,
    /// Maximum embedding distance for a reference match.
    pub match_threshold: f64,
    /// Margin above the match threshold used for the confidence window
    /// (x0.25) and the strong-miss boundary (x0.6).
    pub demotion_margin: f64,
    /// Cap on the consecutive-hit counter.
    pub promote_hits: u32,
    /// Strong misses required to demote a preserved track.
    pub demote_misses: u32,
    /// Frames a track survives without a matching detection.
    pub track_ttl: u32,
    /// Minimum IoU for a detection to claim an existing track.
    pub track_match_threshold: f64,
    /// Base per-side blur box expansion ratio.
    pub blur_expand: f64,
    /// Exponential smoothing factor for the running embedding.
    pub embedding_smooth_alpha: f32,
    /// Required gap between nearest and second-nearest reference distance
    /// for a classification to count as confident.
    pub min_confidence_gap: f64,
    /// When set, every frame must re-confirm against the reference set;
    /// otherwise the running identity estimate can carry a near match.
    pub require_reference_match: bool,
}

impl ModeProfile {
    pub fn for_mode(mode: QualityMode) -> Self {
        match mode {
            QualityMode::Detailed => Self {
                detection_stride: 1,
                detection_width: Some(720),
                detector_confidence: 0.55,
                match_threshold: 0.48,
                demotion_margin: 0.08,
                promote_hits: 2,
                demote_misses: 2,
                track_ttl: 22,
                track_match_threshold: 0.30,
                blur_expand: 0.16,
                embedding_smooth_alpha: 0.60,
                min_confidence_gap: 0.15,
                require_reference_match: false,
            },
            QualityMode::Fast => Self {
                detection_stride: 2,
                detection_width: Some(640),
                detector_confidence: 0.5,
                match_threshold: 0.40,
                demotion_margin: 0.06,
                promote_hits: 3,
                demote_misses: 2,
                track_ttl: 14,
                track_match_threshold: 0.22,
                blur_expand: 0.16,
                embedding_smooth_alpha: 0.45,
                min_confidence_gap: 0.30,
                require_reference_match: true,
            },
        }
    }
}
