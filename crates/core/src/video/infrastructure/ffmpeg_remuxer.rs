use std::path::Path;

use log::info;

use crate::video::domain::audio_remuxer::AudioRemuxer;

/// Stream-copy remuxer via ffmpeg-next: video packets from the encoded
/// file, audio packets from the original, no re-encoding.
pub struct FfmpegRemuxer;

impl FfmpegRemuxer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfmpegRemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioRemuxer for FfmpegRemuxer {
    fn remux(
        &mut self,
        video_only: &Path,
        original: &Path,
        output: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let has_audio = {
            let ictx = ffmpeg_next::format::input(original)?;
            ictx.streams()
                .best(ffmpeg_next::media::Type::Audio)
                .is_some()
        };

        if !has_audio {
            info!("source has no audio stream, copying video as-is");
            std::fs::copy(video_only, output)?;
            return Ok(());
        }

        let mut ictx_video = ffmpeg_next::format::input(video_only)?;
        let mut ictx_audio = ffmpeg_next::format::input(original)?;
        let mut octx = ffmpeg_next::format::output(output)?;

        let mut video_stream_map: Vec<isize> = vec![-1; ictx_video.nb_streams() as usize];
        let mut audio_stream_map: Vec<isize> = vec![-1; ictx_audio.nb_streams() as usize];
        let mut ost_index: usize = 0;

        // Video streams first, then audio, so players default to our stream order.
        for (idx, stream) in ictx_video.streams().enumerate() {
            if stream.parameters().medium() == ffmpeg_next::media::Type::Video {
                let mut ost =
                    octx.add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))?;
                ost.set_parameters(stream.parameters());
                unsafe {
                    (*ost.parameters().as_mut_ptr()).codec_tag = 0;
                }
                video_stream_map[idx] = ost_index as isize;
                ost_index += 1;
            }
        }

        for (idx, stream) in ictx_audio.streams().enumerate() {
            if stream.parameters().medium() == ffmpeg_next::media::Type::Audio {
                let mut ost =
                    octx.add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))?;
                ost.set_parameters(stream.parameters());
                unsafe {
                    (*ost.parameters().as_mut_ptr()).codec_tag = 0;
                }
                audio_stream_map[idx] = ost_index as isize;
                ost_index += 1;
            }
        }

        octx.write_header()?;

        let video_time_bases: Vec<_> = ictx_video.streams().map(|s| s.time_base()).collect();
        for (stream, mut packet) in ictx_video.packets() {
            let ist_idx = stream.index();
            let ost_idx = video_stream_map[ist_idx];
            if ost_idx < 0 {
                continue;
            }
            let ost_time_base = octx
                .stream(ost_idx as usize)
                .ok_or("Remux: missing output stream")?
                .time_base();
            packet.rescale_ts(video_time_bases[ist_idx], ost_time_base);
            packet.set_position(-1);
            packet.set_stream(ost_idx as usize);
            packet.write_interleaved(&mut octx)?;
        }

        let audio_time_bases: Vec<_> = ictx_audio.streams().map(|s| s.time_base()).collect();
        for (stream, mut packet) in ictx_audio.packets() {
            let ist_idx = stream.index();
            let ost_idx = audio_stream_map[ist_idx];
            if ost_idx < 0 {
                continue;
            }
            let ost_time_base = octx
                .stream(ost_idx as usize)
                .ok_or("Remux: missing output stream")?
                .time_base();
            packet.rescale_ts(audio_time_bases[ist_idx], ost_time_base);
            packet.set_position(-1);
            packet.set_stream(ost_idx as usize);
            packet.write_interleaved(&mut octx)?;
        }

        octx.write_trailer()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::infrastructure::ffmpeg_reader::tests::create_test_video;

    #[test]
    fn test_remux_without_audio_copies_video() {
        let dir = tempfile::tempdir().unwrap();
        let video_only = dir.path().join("video_only.mp4");
        let original = dir.path().join("original.mp4");
        let output = dir.path().join("final.mp4");
        create_test_video(&video_only, 3, 160, 120, 30.0);
        create_test_video(&original, 3, 160, 120, 30.0);

        let mut remuxer = FfmpegRemuxer::new();
        remuxer.remux(&video_only, &original, &output).unwrap();

        assert!(output.exists());
        assert_eq!(
            std::fs::metadata(&output).unwrap().len(),
            std::fs::metadata(&video_only).unwrap().len()
        );
    }

    #[test]
    fn test_remux_missing_original_errors() {
        let dir = tempfile::tempdir().unwrap();
        let video_only = dir.path().join("video_only.mp4");
        create_test_video(&video_only, 1, 160, 120, 30.0);

        let mut remuxer = FfmpegRemuxer::new();
        let result = remuxer.remux(
            &video_only,
            Path::new("/nonexistent/original.mp4"),
            &dir.path().join("final.mp4"),
        );
        assert!(result.is_err());
    }
}
