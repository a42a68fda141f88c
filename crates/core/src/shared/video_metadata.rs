use std::path::PathBuf;

/// Properties of an opened video source, captured once at job start.
///
/// `source_path` is kept so the remux step can pull the original audio
/// track back in after the redacted video stream has been written.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction() {
        let meta = VideoMetadata {
            width: 1920,
            height: 1080,
            fps: 30.0,
            total_frames: 900,
            codec: "h264".to_string(),
            source_path: Some(PathBuf::from("/tmp/in.mp4")),
        };
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.total_frames, 900);
        assert_eq!(meta.source_path, Some(PathBuf::from("/tmp/in.mp4")));
    }

    #[test]
    fn test_unknown_frame_count() {
        // Some containers report zero frames; progress reporting must cope.
        let meta = VideoMetadata {
            width: 640,
            height: 480,
            fps: 25.0,
            total_frames: 0,
            codec: String::new(),
            source_path: None,
        };
        assert_eq!(meta.total_frames, 0);
    }
}
