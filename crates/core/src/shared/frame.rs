use ndarray::{ArrayView3, ArrayViewMut3};

/// A single decoded video frame: contiguous RGB bytes in row-major order.
///
/// Pixel format conversion happens at the I/O boundary; everything inside
/// the engine works on this one representation.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Bilinear downscale to `target_width`, preserving aspect ratio.
    ///
    /// Returns the smaller frame and the factor that maps its coordinates
    /// back to this frame. Frames already at or below the target width are
    /// returned untouched with a factor of 1.0.
    pub fn downscaled_to_width(&self, target_width: u32) -> (Frame, f64) {
        if target_width == 0 || self.width <= target_width {
            return (self.clone(), 1.0);
        }

        let ratio = target_width as f64 / self.width as f64;
        let target_height = ((self.height as f64 * ratio).round() as u32).max(1);

        let sw = self.width as usize;
        let sh = self.height as usize;
        let tw = target_width as usize;
        let th = target_height as usize;
        let ch = self.channels as usize;

        let mut out = vec![0u8; tw * th * ch];
        for y in 0..th {
            let src_y = y as f32 * (sh as f32 - 1.0) / (th as f32 - 1.0).max(1.0);
            let y0 = (src_y.floor() as usize).min(sh - 1);
            let y1 = (y0 + 1).min(sh - 1);
            let fy = src_y - y0 as f32;
            for x in 0..tw {
                let src_x = x as f32 * (sw as f32 - 1.0) / (tw as f32 - 1.0).max(1.0);
                let x0 = (src_x.floor() as usize).min(sw - 1);
                let x1 = (x0 + 1).min(sw - 1);
                let fx = src_x - x0 as f32;

                for c in 0..ch {
                    let v00 = self.data[(y0 * sw + x0) * ch + c] as f32;
                    let v10 = self.data[(y0 * sw + x1) * ch + c] as f32;
                    let v01 = self.data[(y1 * sw + x0) * ch + c] as f32;
                    let v11 = self.data[(y1 * sw + x1) * ch + c] as f32;
                    let val = v00 * (1.0 - fx) * (1.0 - fy)
                        + v10 * fx * (1.0 - fy)
                        + v01 * (1.0 - fx) * fy
                        + v11 * fx * fy;
                    out[(y * tw + x) * ch + c] = val.round().clamp(0.0, 255.0) as u8;
                }
            }
        }

        let frame = Frame::new(out, target_width, target_height, self.channels, self.index);
        (frame, 1.0 / ratio)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
