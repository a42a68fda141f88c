/// Rectangular window into a frame, in pixels.
#[derive(Clone, Copy, Debug)]
pub struct RoiRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// Normalized 1-D Gaussian of odd length. Sigma follows the
/// `kernel / 6` convention so the tails land near the kernel edge.
pub fn gaussian_kernel_1d(kernel_size: usize) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    let sigma = kernel_size as f64 / 6.0;
    let center = (kernel_size / 2) as f64;

    let raw: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let d = i as f64 - center;
            (-d * d / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / total) as f32).collect()
}

/// Two-pass separable Gaussian over interleaved `channels`-byte pixels.
///
/// The caller owns `scratch` so repeated passes in a hot loop reuse one
/// allocation. Samples past the borders clamp to the edge pixel.
pub fn separable_gaussian_blur_with_kernel(
    data: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &[f32],
    scratch: &mut Vec<f32>,
) {
    if kernel.len() <= 1 || width == 0 || height == 0 {
        return;
    }
    let reach = kernel.len() / 2;
    scratch.resize(width * height * channels, 0.0);

    // Rows first, bytes into scratch.
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut acc = 0.0f32;
                for (k, &weight) in kernel.iter().enumerate() {
                    let sx = clamp_index(x as isize + k as isize - reach as isize, width);
                    acc += f32::from(data[(y * width + sx) * channels + c]) * weight;
                }
                scratch[(y * width + x) * channels + c] = acc;
            }
        }
    }

    // Then columns, scratch back into bytes.
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut acc = 0.0f32;
                for (k, &weight) in kernel.iter().enumerate() {
                    let sy = clamp_index(y as isize + k as isize - reach as isize, height);
                    acc += scratch[(sy * width + x) * channels + c] * weight;
                }
                data[(y * width + x) * channels + c] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Copy a window out of frame data into a reusable buffer, row by row.
pub fn extract_roi(
    data: &[u8],
    frame_width: usize,
    channels: usize,
    rect: RoiRect,
    roi: &mut Vec<u8>,
) {
    let row_bytes = rect.w * channels;
    roi.resize(rect.h * row_bytes, 0);
    for row in 0..rect.h {
        let src = ((rect.y + row) * frame_width + rect.x) * channels;
        roi[row * row_bytes..(row + 1) * row_bytes].copy_from_slice(&data[src..src + row_bytes]);
    }
}
