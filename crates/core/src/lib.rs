//! Subject-preserving face redaction for video.
//!
//! The engine decodes a video, detects and embeds faces each detection
//! frame, matches them against an enrolled reference identity, carries
//! identities across frames with short-lived tracks, blurs every face
//! not recognized as the subject, and re-encodes the result with the
//! original audio remuxed back in.

pub mod blurring;
pub mod detection;
pub mod error;
pub mod identity;
pub mod pipeline;
pub mod profile;
pub mod shared;
pub mod tracking;
pub mod video;
