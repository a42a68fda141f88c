use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use clipveil_core::detection::domain::face_detector::FaceDetector;
use clipveil_core::detection::domain::face_embedder::FaceEmbedder;
use clipveil_core::detection::infrastructure::onnx_face_detector::OnnxFaceDetector;
use clipveil_core::detection::infrastructure::onnx_face_embedder::OnnxFaceEmbedder;
use clipveil_core::identity::classifier::IdentityClassifier;
use clipveil_core::identity::enrollment;
use clipveil_core::identity::reference::{ReferenceEmbeddingSet, StoredProfile};
use clipveil_core::pipeline::orchestrator::FrameOrchestrator;
use clipveil_core::profile::{ModeProfile, QualityMode};
use clipveil_core::shared::constants::{
    DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL,
};
use clipveil_core::shared::frame::Frame;
use clipveil_core::shared::model_resolver;
use clipveil_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use clipveil_core::video::infrastructure::ffmpeg_remuxer::FfmpegRemuxer;
use clipveil_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Blur every face in a video except the enrolled subject's.
#[derive(Parser)]
#[command(name = "clipveil")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Output video file.
    output: PathBuf,

    /// Quality mode: fast or detailed.
    #[arg(long, default_value = "fast")]
    mode: String,

    /// Blur intensity (1-10).
    #[arg(long, default_value = "5")]
    blur_level: u8,

    /// Saved subject profile (JSON with precomputed embeddings).
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Subject photo(s) to enroll from (repeatable).
    #[arg(long = "reference-image")]
    reference_images: Vec<PathBuf>,

    /// Write the enrolled subject profile to this path for reuse.
    #[arg(long)]
    save_profile: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let mode = parse_mode(&cli.mode)?;
    let profile = ModeProfile::for_mode(mode);

    let mut detector = build_detector(profile.detector_confidence)?;
    let mut embedder = build_embedder()?;

    let references = if let Some(profile_path) = &cli.profile {
        StoredProfile::load(profile_path)?
    } else {
        enroll_from_photos(&cli.reference_images, detector.as_mut(), embedder.as_mut())?
    };
    if let Some(save_path) = &cli.save_profile {
        StoredProfile::save(&references, save_path)?;
        log::info!("Subject profile saved to {}", save_path.display());
    }

    let classifier = IdentityClassifier::new(profile, references);
    let orchestrator = FrameOrchestrator::new(
        Box::new(FfmpegReader::new()),
        Box::new(FfmpegWriter::new()),
        detector,
        embedder,
        Box::new(FfmpegRemuxer::new()),
        classifier,
        cli.blur_level,
    )
    .with_progress(Box::new(|fraction| {
        eprint!("\rProcessing... {:3.0}%", fraction * 100.0);
    }));

    let summary = orchestrator.run(&cli.input, &cli.output)?;
    eprintln!();
    log::info!(
        "Done: {} frames, {} subject sightings preserved, {} faces blurred",
        summary.frames_processed,
        summary.faces_preserved,
        summary.faces_redacted
    );
    log::info!("Output written to {}", cli.output.display());
    Ok(())
}

fn enroll_from_photos(
    paths: &[PathBuf],
    detector: &mut dyn FaceDetector,
    embedder: &mut dyn FaceEmbedder,
) -> Result<ReferenceEmbeddingSet, Box<dyn std::error::Error>> {
    let mut photos = Vec::with_capacity(paths.len());
    for path in paths {
        photos.push(load_photo(path)?);
    }
    Ok(enrollment::enroll(&photos, detector, embedder)?)
}

fn load_photo(path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
    let rgb = image::open(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(rgb.into_raw(), width, height, 3, 0))
}

fn build_detector(confidence: f64) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {DETECTOR_MODEL_NAME}");
    let model_path = model_resolver::resolve(DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, None)?;
    Ok(Box::new(OnnxFaceDetector::new(&model_path, confidence)?))
}

fn build_embedder() -> Result<Box<dyn FaceEmbedder>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {EMBEDDING_MODEL_NAME}");
    let model_path = model_resolver::resolve(EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, None)?;
    Ok(Box::new(OnnxFaceEmbedder::new(&model_path)?))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.profile.is_none() && cli.reference_images.is_empty() {
        return Err("Provide --profile or at least one --reference-image".into());
    }
    if cli.profile.is_some() && !cli.reference_images.is_empty() {
        return Err("--profile and --reference-image are mutually exclusive".into());
    }
    if !(1..=10).contains(&cli.blur_level) {
        return Err(format!("Blur level must be between 1 and 10, got {}", cli.blur_level).into());
    }
    Ok(())
}

fn parse_mode(mode: &str) -> Result<QualityMode, Box<dyn std::error::Error>> {
    match mode {
        "fast" => Ok(QualityMode::Fast),
        "detailed" => Ok(QualityMode::Detailed),
        other => Err(format!("Mode must be 'fast' or 'detailed', got '{other}'").into()),
    }
}
