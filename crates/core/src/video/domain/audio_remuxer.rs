use std::path::Path;

/// Recombines the untouched audio of the source file with the freshly
/// encoded video-only stream.
///
/// When the source carries no audio stream, implementations still
/// produce `output` (as a plain copy of `video_only`).
pub trait AudioRemuxer: Send {
    fn remux(
        &mut self,
        video_only: &Path,
        original: &Path,
        output: &Path,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
