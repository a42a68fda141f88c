use crate::shared::bbox::BBox;

/// Greedy IoU assignment of detections to existing tracks.
///
/// Detections are visited in detector order; each takes the unclaimed
/// track with the highest IoU at or above `min_iou`, ties going to the
/// earlier track. A track is claimed by at most one detection per frame.
///
/// Returns one entry per detection: the claimed track index, or `None`
/// for a detection that should spawn a new track.
pub fn assign(track_boxes: &[BBox], detections: &[BBox], min_iou: f64) -> Vec<Option<usize>> {
    let mut claimed = vec![false; track_boxes.len()];
    detections
        .iter()
        .map(|detection| {
            let mut best: Option<(usize, f64)> = None;
            for (idx, track_box) in track_boxes.iter().enumerate() {
                if claimed[idx] {
                    continue;
                }
                let iou = track_box.iou(detection);
                if iou < min_iou {
                    continue;
                }
                if best.map_or(true, |(_, best_iou)| iou > best_iou) {
                    best = Some((idx, iou));
                }
            }
            best.map(|(idx, _)| {
                claimed[idx] = true;
                idx
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_picks_highest_overlap() {
        let tracks = [BBox::new(0, 0, 50, 50), BBox::new(10, 10, 50, 50)];
        let detections = [BBox::new(12, 12, 50, 50)];
        assert_eq!(assign(&tracks, &detections, 0.3), vec![Some(1)]);
    }

    #[test]
    fn test_assign_below_threshold_is_unmatched() {
        let tracks = [BBox::new(0, 0, 50, 50)];
        let detections = [BBox::new(200, 200, 50, 50)];
        assert_eq!(assign(&tracks, &detections, 0.3), vec![None]);
    }

    #[test]
    fn test_assign_track_claimed_once() {
        // Both detections overlap the same track; only the first claims it.
        let tracks = [BBox::new(0, 0, 100, 100)];
        let detections = [BBox::new(5, 5, 100, 100), BBox::new(10, 10, 100, 100)];
        assert_eq!(assign(&tracks, &detections, 0.3), vec![Some(0), None]);
    }

    #[test]
    fn test_assign_two_detections_two_tracks() {
        let tracks = [BBox::new(0, 0, 50, 50), BBox::new(200, 0, 50, 50)];
        let detections = [BBox::new(198, 2, 50, 50), BBox::new(2, 2, 50, 50)];
        assert_eq!(assign(&tracks, &detections, 0.3), vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_assign_no_tracks() {
        let detections = [BBox::new(0, 0, 10, 10)];
        assert_eq!(assign(&[], &detections, 0.3), vec![None]);
    }

    #[test]
    fn test_assign_tie_goes_to_earlier_track() {
        let tracks = [BBox::new(0, 0, 50, 50), BBox::new(0, 0, 50, 50)];
        let detections = [BBox::new(0, 0, 50, 50)];
        assert_eq!(assign(&tracks, &detections, 0.3), vec![Some(0)]);
    }
}
