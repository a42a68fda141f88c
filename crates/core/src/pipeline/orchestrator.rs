use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::blurring::compositor::BlurCompositor;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_embedder::FaceEmbedder;
use crate::error::RedactionError;
use crate::identity::classifier::{IdentityClassifier, Observation};
use crate::shared::frame::Frame;
use crate::tracking::table::TrackTable;
use crate::video::domain::audio_remuxer::AudioRemuxer;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

const CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Progress callback: receives a monotonically non-decreasing fraction
/// of frames consumed, in [0, 1].
pub type ProgressFn = Box<dyn Fn(f64) + Send>;

/// Counters accumulated over one redaction job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RedactionSummary {
    pub frames_processed: usize,
    pub faces_preserved: usize,
    pub faces_redacted: usize,
}

/// Drives one video through detect → classify → track → blur → encode,
/// then recombines the original audio.
///
/// Decoding and encoding run on dedicated threads over bounded channels;
/// tracking and classification stay on the calling thread so the track
/// table advances in strict frame order.
pub struct FrameOrchestrator {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    detector: Box<dyn FaceDetector>,
    embedder: Box<dyn FaceEmbedder>,
    remuxer: Box<dyn AudioRemuxer>,
    classifier: IdentityClassifier,
    compositor: BlurCompositor,
    on_progress: Option<ProgressFn>,
}

impl FrameOrchestrator {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: Box<dyn FaceDetector>,
        embedder: Box<dyn FaceEmbedder>,
        remuxer: Box<dyn AudioRemuxer>,
        classifier: IdentityClassifier,
        blur_level: u8,
    ) -> Self {
        let compositor = BlurCompositor::new(blur_level, classifier.profile().blur_expand);
        Self {
            reader,
            writer,
            detector,
            embedder,
            remuxer,
            classifier,
            compositor,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Process `input` end to end and write the finished file to `output`.
    ///
    /// The visual stream is encoded into an intermediate sibling file
    /// first; once the audio remux into `output` succeeds, the
    /// intermediate is deleted.
    pub fn run(self, input: &Path, output: &Path) -> Result<RedactionSummary, RedactionError> {
        let FrameOrchestrator {
            mut reader,
            mut writer,
            mut detector,
            mut embedder,
            mut remuxer,
            classifier,
            mut compositor,
            on_progress,
        } = self;

        let metadata = reader.open(input).map_err(RedactionError::video_io)?;
        let intermediate = intermediate_path(output);
        writer
            .open(&intermediate, &metadata)
            .map_err(RedactionError::video_io)?;

        let (frame_tx, frame_rx) =
            crossbeam_channel::bounded::<Result<Frame, SendError>>(CHANNEL_CAPACITY);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<Frame>(CHANNEL_CAPACITY);

        let reader_handle = spawn_reader(reader, frame_tx);
        let writer_handle = spawn_writer(writer, write_rx);

        let frame_width = metadata.width;
        let frame_height = metadata.height;
        let total_frames = metadata.total_frames;
        let stride = classifier.profile().detection_stride.max(1);
        let detection_width = classifier.profile().detection_width;

        let mut table = TrackTable::new();
        let mut summary = RedactionSummary::default();
        let mut first_error: Option<RedactionError> = None;
        let mut encoder_gone = false;

        for frame_result in &frame_rx {
            let mut frame = match frame_result {
                Ok(frame) => frame,
                Err(e) => {
                    first_error = Some(RedactionError::video_io(e));
                    break;
                }
            };

            let outcome = if summary.frames_processed % stride == 0 {
                match observe(detector.as_mut(), embedder.as_mut(), &frame, detection_width) {
                    Ok(observations) if observations.is_empty() => {
                        table.decay(&classifier, frame_width, frame_height)
                    }
                    Ok(observations) => {
                        table.advance(&observations, &classifier, frame_width, frame_height)
                    }
                    Err(e) => {
                        first_error = Some(e);
                        break;
                    }
                }
            } else {
                table.tick(frame_width, frame_height)
            };

            summary.faces_preserved += outcome.preserved;
            for bbox in &outcome.redacted {
                if compositor.apply(&mut frame, bbox) {
                    summary.faces_redacted += 1;
                }
            }
            summary.frames_processed += 1;

            if write_tx.send(frame).is_err() {
                // The encode thread is gone; its join result carries the
                // actual failure, so record the cause there.
                encoder_gone = true;
                break;
            }

            if total_frames > 0 {
                if let Some(ref callback) = on_progress {
                    let fraction = (summary.frames_processed as f64 / total_frames as f64).min(1.0);
                    callback(fraction);
                }
            }
        }

        drop(frame_rx);
        drop(write_tx);
        join_io_threads(reader_handle, writer_handle, &mut first_error);
        if encoder_gone && first_error.is_none() {
            first_error = Some(RedactionError::video_io("encoder stopped unexpectedly"));
        }

        if let Some(e) = first_error {
            let _ = std::fs::remove_file(&intermediate);
            return Err(e);
        }

        remuxer
            .remux(&intermediate, input, output)
            .map_err(|e| RedactionError::Remux(e.to_string()))?;
        if let Err(e) = std::fs::remove_file(&intermediate) {
            warn!("could not remove intermediate file: {e}");
        }

        if let Some(ref callback) = on_progress {
            callback(1.0);
        }

        info!(
            "processed {} frames: preserved={} redacted={}",
            summary.frames_processed, summary.faces_preserved, summary.faces_redacted
        );
        Ok(summary)
    }
}

/// Run the detector (on a downscaled copy when configured) and embed
/// every accepted box.
fn observe(
    detector: &mut dyn FaceDetector,
    embedder: &mut dyn FaceEmbedder,
    frame: &Frame,
    detection_width: Option<u32>,
) -> Result<Vec<Observation>, RedactionError> {
    let faces = match detection_width {
        Some(target) if frame.width() > target => {
            let (small, inverse) = frame.downscaled_to_width(target);
            let mut faces = detector.detect(&small).map_err(RedactionError::adapter)?;
            for face in &mut faces {
                face.bbox = face.bbox.scaled(inverse);
            }
            faces
        }
        _ => detector.detect(frame).map_err(RedactionError::adapter)?,
    };

    let mut observations = Vec::with_capacity(faces.len());
    for face in faces {
        let bbox = face.bbox.clamped(frame.width(), frame.height());
        let embedding = embedder
            .embed(frame, &bbox)
            .map_err(RedactionError::adapter)?;
        observations.push(Observation { bbox, embedding });
    }
    Ok(observations)
}

/// Sibling path holding the video-only stream until audio is remuxed.
fn intermediate_path(output: &Path) -> PathBuf {
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4");
    output.with_extension(format!("video.{ext}"))
}

/// Decode thread: push frames downstream until the channel closes, then
/// release the reader.
fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    tx: crossbeam_channel::Sender<Result<Frame, SendError>>,
) -> std::thread::JoinHandle<Box<dyn VideoReader>> {
    std::thread::spawn(move || {
        for result in reader.frames() {
            let sendable = result.map_err(|e| SendError::from(e.to_string()));
            if tx.send(sendable).is_err() {
                break;
            }
        }
        reader.close();
        reader
    })
}

/// Encode thread: drain processed frames, then finalize the container.
fn spawn_writer(
    mut writer: Box<dyn VideoWriter>,
    rx: crossbeam_channel::Receiver<Frame>,
) -> std::thread::JoinHandle<Result<Box<dyn VideoWriter>, SendError>> {
    let to_send = |e: Box<dyn std::error::Error>| SendError::from(e.to_string());
    std::thread::spawn(move || {
        for frame in rx {
            writer.write(&frame).map_err(to_send)?;
        }
        writer.close().map_err(to_send)?;
        Ok(writer)
    })
}

/// Joins the I/O threads and records the first error encountered.
fn join_io_threads(
    reader_handle: std::thread::JoinHandle<Box<dyn VideoReader>>,
    writer_handle: std::thread::JoinHandle<Result<Box<dyn VideoWriter>, SendError>>,
    first_error: &mut Option<RedactionError>,
) {
    fn set_if_none(slot: &mut Option<RedactionError>, err: RedactionError) {
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    if reader_handle.join().is_err() {
        set_if_none(first_error, RedactionError::video_io("reader thread panicked"));
    }

    match writer_handle.join() {
        Ok(Ok(_writer)) => {}
        Ok(Err(e)) => set_if_none(first_error, RedactionError::video_io(e)),
        Err(_) => set_if_none(first_error, RedactionError::video_io("writer thread panicked")),
    }
}
