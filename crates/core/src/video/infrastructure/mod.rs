pub mod ffmpeg_reader;
pub mod ffmpeg_remuxer;
pub mod ffmpeg_writer;

pub use ffmpeg_reader::FfmpegReader;
pub use ffmpeg_remuxer::FfmpegRemuxer;
pub use ffmpeg_writer::FfmpegWriter;
