pub mod orchestrator;
pub mod progress;

pub use orchestrator::{FrameOrchestrator, ProgressFn, RedactionSummary};
pub use progress::{JobState, ProgressSnapshot, SharedProgress};
