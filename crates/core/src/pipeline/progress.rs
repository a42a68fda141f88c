use std::sync::{Arc, Mutex, PoisonError};

use crate::pipeline::orchestrator::ProgressFn;

/// Lifecycle of one redaction job as seen by observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Finished,
    Failed,
}

/// Point-in-time view of a job's progress.
#[derive(Clone, Debug)]
pub struct ProgressSnapshot {
    pub state: JobState,
    pub fraction: f64,
    pub message: String,
}

/// Single-writer/multi-reader progress record for one job.
///
/// Cheap to clone; all clones observe the same job. The fraction is
/// clamped to [0, 1] and never moves backwards, so readers polling at
/// their own pace see a monotone sequence.
#[derive(Clone)]
pub struct SharedProgress {
    inner: Arc<Mutex<ProgressSnapshot>>,
}

impl Default for SharedProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedProgress {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProgressSnapshot {
                state: JobState::Pending,
                fraction: 0.0,
                message: String::new(),
            })),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.lock().clone()
    }

    /// Advance the running fraction. Regressions and out-of-range values
    /// are clamped away rather than surfaced.
    pub fn advance(&self, fraction: f64) {
        let mut inner = self.lock();
        inner.state = JobState::Running;
        let clamped = fraction.clamp(0.0, 1.0);
        if clamped > inner.fraction {
            inner.fraction = clamped;
        }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.lock().message = message.into();
    }

    pub fn finish(&self) {
        let mut inner = self.lock();
        inner.state = JobState::Finished;
        inner.fraction = 1.0;
    }

    pub fn fail(&self, message: impl Into<String>) {
        let mut inner = self.lock();
        inner.state = JobState::Failed;
        inner.message = message.into();
    }

    /// Adapter for [`FrameOrchestrator::with_progress`].
    ///
    /// [`FrameOrchestrator::with_progress`]: crate::pipeline::orchestrator::FrameOrchestrator::with_progress
    pub fn frame_callback(&self) -> ProgressFn {
        let progress = self.clone();
        Box::new(move |fraction| progress.advance(fraction))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProgressSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
