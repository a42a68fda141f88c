pub mod audio_remuxer;
pub mod video_reader;
pub mod video_writer;

pub use audio_remuxer::AudioRemuxer;
pub use video_reader::VideoReader;
pub use video_writer::VideoWriter;
