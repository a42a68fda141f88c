pub mod face_detector;
pub mod face_embedder;

pub use face_detector::{FaceBox, FaceDetector};
pub use face_embedder::FaceEmbedder;
