use std::path::Path;

use ffmpeg_next as ff;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Encodes the redacted frame stream into a video-only container.
///
/// Audio never passes through here; the
/// [`AudioRemuxer`](crate::video::domain::audio_remuxer::AudioRemuxer)
/// port folds the original track back in afterwards.
pub struct FfmpegWriter {
    output: Option<ff::format::context::Output>,
    encoder: Option<ff::codec::encoder::video::Encoder>,
    to_yuv: Option<ff::software::scaling::Context>,
    width: u32,
    height: u32,
    fps: i32,
    next_pts: i64,
}

// Safety: the writer is driven from one thread at a time; the ffmpeg
// pointers inside are never shared.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            output: None,
            encoder: None,
            to_yuv: None,
            width: 0,
            height: 0,
            fps: 0,
            next_pts: 0,
        }
    }

    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let encoder = self.encoder.as_mut().ok_or("FfmpegWriter: not opened")?;
        let output = self.output.as_mut().ok_or("FfmpegWriter: no output")?;
        let time_base = output
            .stream(0)
            .ok_or("FfmpegWriter: missing output stream")?
            .time_base();

        let mut packet = ff::Packet::empty();
        while encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(ff::Rational(1, self.fps), time_base);
            packet.write_interleaved(output)?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ff::init()?;

        self.width = metadata.width;
        self.height = metadata.height;
        // Sources with a broken rate still need a valid time base.
        self.fps = match metadata.fps.round() as i32 {
            n if n > 0 => n,
            _ => 30,
        };

        let mut output = ff::format::output(path)?;
        let needs_global_header = output
            .format()
            .flags()
            .contains(ff::format::Flags::GLOBAL_HEADER);

        // MPEG4 is available in every ffmpeg build we target.
        let codec =
            ff::encoder::find(ff::codec::Id::MPEG4).ok_or("MPEG4 encoder not available")?;
        let mut stream = output.add_stream(Some(codec))?;

        let mut ctx = ff::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        ctx.set_width(metadata.width);
        ctx.set_height(metadata.height);
        ctx.set_format(ff::format::Pixel::YUV420P);
        ctx.set_time_base(ff::Rational(1, self.fps));
        ctx.set_frame_rate(Some(ff::Rational(self.fps, 1)));
        if needs_global_header {
            ctx.set_flags(ff::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = ctx.open_with(ff::Dictionary::new())?;
        stream.set_parameters(&encoder);
        output.write_header()?;

        self.to_yuv = Some(ff::software::scaling::Context::get(
            ff::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ff::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ff::software::scaling::Flags::BILINEAR,
        )?);
        self.output = Some(output);
        self.encoder = Some(encoder);
        self.next_pts = 0;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let mut rgb =
            ff::util::frame::video::Video::new(ff::format::Pixel::RGB24, self.width, self.height);

        // ffmpeg rows may be wider than width * 3; copy row by row.
        let row_bytes = self.width as usize * 3;
        let stride = rgb.stride(0);
        let dst = rgb.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_bytes).enumerate() {
            dst[row * stride..row * stride + row_bytes].copy_from_slice(src_row);
        }

        let mut yuv = ff::util::frame::video::Video::empty();
        self.to_yuv
            .as_mut()
            .ok_or("FfmpegWriter: not opened")?
            .run(&rgb, &mut yuv)?;
        yuv.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .as_mut()
            .ok_or("FfmpegWriter: not opened")?
            .send_frame(&yuv)?;
        self.drain_packets()
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.encoder.is_some() {
            self.encoder
                .as_mut()
                .ok_or("FfmpegWriter: not opened")?
                .send_eof()?;
            self.drain_packets()?;
            self.output
                .as_mut()
                .ok_or("FfmpegWriter: no output")?
                .write_trailer()?;
        }

        self.output = None;
        self.encoder = None;
        self.to_yuv = None;
        Ok(())
    }
}
