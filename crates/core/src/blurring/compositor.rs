use crate::blurring::gaussian::{
    extract_roi, gaussian_kernel_1d, separable_gaussian_blur_with_kernel, RoiRect,
};
use crate::shared::bbox::BBox;
use crate::shared::frame::Frame;

const MIN_KERNEL: usize = 9;
const MAX_KERNEL: usize = 151;
const MAX_EXPAND_RATIO: f64 = 0.35;

/// Obscures face regions in place with a multi-pass Gaussian blur,
/// composited through an elliptical mask so the corners of the box keep
/// the original pixels.
///
/// Owns its scratch buffers; one instance is reused across all frames
/// of a job.
pub struct BlurCompositor {
    /// Blur strength, 1 (light) to 10 (maximum).
    level: u8,
    /// Profile-supplied base expansion per side.
    base_expand: f64,
    roi: Vec<u8>,
    temp: Vec<f32>,
}

impl BlurCompositor {
    pub fn new(level: u8, base_expand: f64) -> Self {
        Self {
            level: level.clamp(1, 10),
            base_expand,
            roi: Vec::new(),
            temp: Vec::new(),
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Blur one face region. Returns false when the expanded region is
    /// degenerate and nothing was composited.
    pub fn apply(&mut self, frame: &mut Frame, bbox: &BBox) -> bool {
        let ratio = expand_ratio(self.level, self.base_expand);
        let Some(rect) = expanded_rect(bbox, frame.width(), frame.height(), ratio) else {
            return false;
        };

        let passes = pass_count(self.level);
        let kernel_size = kernel_size_for_region(rect.w, rect.h, self.level, passes);
        let kernel = gaussian_kernel_1d(kernel_size);

        let channels = frame.channels() as usize;
        let frame_width = frame.width() as usize;
        extract_roi(frame.data(), frame_width, channels, rect, &mut self.roi);
        for _ in 0..passes {
            separable_gaussian_blur_with_kernel(
                &mut self.roi,
                rect.w,
                rect.h,
                channels,
                &kernel,
                &mut self.temp,
            );
        }

        composite_ellipse(frame.data_mut(), &self.roi, frame_width, channels, rect);
        true
    }
}

/// Per-side box expansion: grows with the level, capped at 35%.
fn expand_ratio(level: u8, base_expand: f64) -> f64 {
    let extra = f64::from(level.saturating_sub(1)) * 0.01;
    (base_expand + extra).min(MAX_EXPAND_RATIO)
}

/// Number of blur passes: 1 below level 5, then one more every two levels.
fn pass_count(level: u8) -> usize {
    1 + (usize::from(level).saturating_sub(5)) / 2
}

/// Kernel size scales with the region and the level, strengthened for
/// multi-pass blurs, clamped to [9, 151] and forced odd.
fn kernel_size_for_region(width: usize, height: usize, level: u8, passes: usize) -> usize {
    let base = width.max(height) as f64;
    let strength = 0.18 + f64::from(level) / 12.0;
    let mut kernel = strength * base;
    if passes > 1 {
        kernel *= 1.0 + 0.25 * (passes - 1) as f64;
    }
    let mut kernel = (kernel as usize).clamp(MIN_KERNEL, MAX_KERNEL);
    if kernel % 2 == 0 {
        kernel += 1;
    }
    kernel
}

/// Expand a face box by `ratio` per side and clip to the frame,
/// returning `None` when nothing of it remains on screen.
fn expanded_rect(bbox: &BBox, frame_width: u32, frame_height: u32, ratio: f64) -> Option<RoiRect> {
    let w = f64::from(bbox.width);
    let h = f64::from(bbox.height);
    let x1 = ((f64::from(bbox.x) - w * ratio) as i64).max(0);
    let y1 = ((f64::from(bbox.y) - h * ratio) as i64).max(0);
    let x2 = ((f64::from(bbox.x) + w * (1.0 + ratio)) as i64).min(i64::from(frame_width));
    let y2 = ((f64::from(bbox.y) + h * (1.0 + ratio)) as i64).min(i64::from(frame_height));
    if x1 >= x2 || y1 >= y2 {
        return None;
    }
    Some(RoiRect {
        x: x1 as usize,
        y: y1 as usize,
        w: (x2 - x1) as usize,
        h: (y2 - y1) as usize,
    })
}

/// Write the blurred ROI back, but only inside the axis-aligned ellipse
/// inscribed in the rect. Pixels outside the ellipse keep their
/// original values.
fn composite_ellipse(data: &mut [u8], roi: &[u8], frame_width: usize, channels: usize, rect: RoiRect) {
    let cx = (rect.w / 2) as f64;
    let cy = (rect.h / 2) as f64;
    let ax = ((rect.w / 2).max(1)) as f64;
    let ay = ((rect.h / 2).max(1)) as f64;

    for row in 0..rect.h {
        let dy = (row as f64 - cy) / ay;
        for col in 0..rect.w {
            let dx = (col as f64 - cx) / ax;
            if dx * dx + dy * dy > 1.0 {
                continue;
            }
            let dst = ((rect.y + row) * frame_width + rect.x + col) * channels;
            let src = (row * rect.w + col) * channels;
            data[dst..dst + channels].copy_from_slice(&roi[src..src + channels]);
        }
    }
}
