pub mod onnx_face_detector;
pub mod onnx_face_embedder;

pub use onnx_face_detector::OnnxFaceDetector;
pub use onnx_face_embedder::OnnxFaceEmbedder;
