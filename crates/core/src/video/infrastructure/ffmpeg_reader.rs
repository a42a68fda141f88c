use std::path::Path;

use ffmpeg_next as ff;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Decodes a video into RGB24 [`Frame`]s through libavformat/libavcodec.
pub struct FfmpegReader {
    input: Option<ff::format::context::Input>,
    stream_index: usize,
}

// Safety: the reader is driven from one thread at a time; the ffmpeg
// pointers inside are never shared.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input: None,
            stream_index: 0,
        }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ff::init()?;

        let input = ff::format::input(path)?;
        let stream = input
            .streams()
            .best(ff::media::Type::Video)
            .ok_or("no video stream in input")?;
        self.stream_index = stream.index();

        let decoder = ff::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let rate = stream.rate();
        let fps = match rate.denominator() {
            0 => 0.0,
            d => rate.numerator() as f64 / d as f64,
        };
        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames: stream.frames().max(0) as usize,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        self.input = Some(input);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let stream_index = self.stream_index;
        let Some(input) = self.input.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };

        // open() validated the stream, so these cannot fail here.
        let stream = input.streams().best(ff::media::Type::Video).unwrap();
        let decoder = ff::codec::context::Context::from_parameters(stream.parameters())
            .unwrap()
            .decoder()
            .video()
            .unwrap();

        let (width, height) = (decoder.width(), decoder.height());
        let to_rgb = ff::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ff::format::Pixel::RGB24,
            width,
            height,
            ff::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        Box::new(DecodedFrames {
            input,
            decoder,
            to_rgb,
            width,
            height,
            stream_index,
            next_index: 0,
            flushing: false,
            exhausted: false,
        })
    }

    fn close(&mut self) {
        self.input = None;
    }
}

/// Pulls frames out of the decoder one at a time so only a single frame
/// is resident per step.
struct DecodedFrames<'a> {
    input: &'a mut ff::format::context::Input,
    decoder: ff::decoder::Video,
    to_rgb: ff::software::scaling::Context,
    width: u32,
    height: u32,
    stream_index: usize,
    next_index: usize,
    flushing: bool,
    exhausted: bool,
}

impl DecodedFrames<'_> {
    fn drain_one(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut raw = ff::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut raw).is_err() {
            return None;
        }

        let mut rgb = ff::util::frame::video::Video::empty();
        if let Err(e) = self.to_rgb.run(&raw, &mut rgb) {
            return Some(Err(Box::new(e)));
        }

        let frame = Frame::new(
            pack_rgb(&rgb, self.width, self.height),
            self.width,
            self.height,
            3,
            self.next_index,
        );
        self.next_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for DecodedFrames<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        if let Some(result) = self.drain_one() {
            return Some(result);
        }
        if self.flushing {
            self.exhausted = true;
            return None;
        }

        loop {
            match self.input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    if self.decoder.send_packet(&packet).is_err() {
                        continue;
                    }
                    if let Some(result) = self.drain_one() {
                        return Some(result);
                    }
                }
                None => {
                    let _ = self.decoder.send_eof();
                    self.flushing = true;
                    return match self.drain_one() {
                        Some(result) => Some(result),
                        None => {
                            self.exhausted = true;
                            None
                        }
                    };
                }
            }
        }
    }
}

/// Strip the per-row stride padding ffmpeg may leave after `width * 3`
/// bytes, yielding a tightly packed RGB buffer.
fn pack_rgb(rgb: &ff::util::frame::video::Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let source = rgb.data(0);
    let row_bytes = width as usize * 3;

    let mut packed = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        packed.extend_from_slice(&source[start..start + row_bytes]);
    }
    packed
}
