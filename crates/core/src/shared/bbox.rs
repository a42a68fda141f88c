/// Axis-aligned bounding box in frame pixel coordinates.
///
/// Uses `(x, y, width, height)` with integer pixels, matching detector
/// output. Geometry helpers keep boxes inside frame bounds; a clamped box
/// always has at least one pixel of area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersection-over-union, with the union floored at one pixel so a
    /// pair of degenerate boxes yields 0 instead of dividing by zero.
    pub fn iou(&self, other: &BBox) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.width).min(other.x + other.width);
        let iy2 = (self.y + self.height).min(other.y + other.height);

        let inter = (ix2 - ix1).max(0) as i64 * (iy2 - iy1).max(0) as i64;
        let area_a = self.width as i64 * self.height as i64;
        let area_b = other.width as i64 * other.height as i64;
        let union = (area_a + area_b - inter).max(1);
        inter as f64 / union as f64
    }

    /// Clamp to frame bounds. The origin stays strictly inside the frame
    /// and width/height are floored at one pixel.
    pub fn clamped(&self, frame_width: u32, frame_height: u32) -> BBox {
        let fw = (frame_width as i32).max(1);
        let fh = (frame_height as i32).max(1);
        let x = self.x.clamp(0, fw - 1);
        let y = self.y.clamp(0, fh - 1);
        let width = self.width.clamp(1, fw - x);
        let height = self.height.clamp(1, fh - y);
        BBox {
            x,
            y,
            width,
            height,
        }
    }

    /// Dimension-wise midpoint of two boxes, used to smooth a track's box
    /// toward a freshly matched detection.
    pub fn midpoint(&self, other: &BBox) -> BBox {
        BBox {
            x: (self.x + other.x) / 2,
            y: (self.y + other.y) / 2,
            width: (self.width + other.width) / 2,
            height: (self.height + other.height) / 2,
        }
    }

    /// Scale every coordinate by `factor`, flooring width/height at one
    /// pixel. Used to map detections from a downscaled detection frame
    /// back to full resolution.
    pub fn scaled(&self, factor: f64) -> BBox {
        BBox {
            x: ((self.x as f64 * factor) as i32).max(0),
            y: ((self.y as f64 * factor) as i32).max(0),
            width: ((self.width as f64 * factor) as i32).max(1),
            height: ((self.height as f64 * factor) as i32).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_iou_identical() {
        let a = BBox::new(10, 10, 100, 100);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = BBox::new(0, 0, 50, 50);
        let b = BBox::new(100, 100, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // inter = 50*100 = 5000, union = 10000 + 10000 - 5000
        let a = BBox::new(0, 0, 100, 100);
        let b = BBox::new(50, 0, 100, 100);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_iou_touching_edges_is_zero() {
        let a = BBox::new(0, 0, 50, 50);
        let b = BBox::new(50, 0, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[rstest]
    #[case::zero_width(BBox::new(0, 0, 0, 100))]
    #[case::zero_height(BBox::new(0, 0, 100, 0))]
    fn test_iou_degenerate_is_zero(#[case] a: BBox) {
        let b = BBox::new(0, 0, 50, 50);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_both_degenerate_no_panic() {
        let a = BBox::new(0, 0, 0, 0);
        assert_relative_eq!(a.iou(&a), 0.0);
    }

    #[test]
    fn test_clamped_inside_is_unchanged() {
        let b = BBox::new(10, 20, 30, 40);
        assert_eq!(b.clamped(100, 100), b);
    }

    #[test]
    fn test_clamped_negative_origin() {
        let b = BBox::new(-10, -5, 50, 50);
        assert_eq!(b.clamped(100, 100), BBox::new(0, 0, 50, 50));
    }

    #[test]
    fn test_clamped_overflowing_size() {
        let b = BBox::new(80, 90, 50, 50);
        assert_eq!(b.clamped(100, 100), BBox::new(80, 90, 20, 10));
    }

    #[test]
    fn test_clamped_never_empty() {
        let b = BBox::new(500, 500, 0, 0);
        let c = b.clamped(100, 100);
        assert_eq!(c, BBox::new(99, 99, 1, 1));
    }

    #[test]
    fn test_midpoint_blend() {
        let a = BBox::new(0, 0, 100, 100);
        let b = BBox::new(10, 20, 50, 80);
        assert_eq!(a.midpoint(&b), BBox::new(5, 10, 75, 90));
    }

    #[test]
    fn test_scaled_back_to_full_resolution() {
        // Detection at half resolution scaled back by 2.0
        let b = BBox::new(10, 15, 20, 25);
        assert_eq!(b.scaled(2.0), BBox::new(20, 30, 40, 50));
    }

    #[test]
    fn test_scaled_floors_size_at_one() {
        let b = BBox::new(4, 4, 1, 1);
        let s = b.scaled(0.25);
        assert_eq!(s.width, 1);
        assert_eq!(s.height, 1);
    }
}
