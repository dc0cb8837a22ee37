//! Progress hooks for the per-year pipeline loop. The CLI renders them as
//! an `indicatif` bar; library callers and tests pass [`NullProgress`].

use std::sync::Arc;

/// Receives progress from a pipeline run. One unit is one processed year.
pub trait ProgressCallback: Send + Sync {
    /// Number of years the run will process.
    fn set_total(&self, total: u64);

    /// Advances by `delta` years.
    fn inc(&self, delta: u64);

    /// Current step, e.g. `Year 2019`.
    fn set_message(&self, msg: String);

    /// Marks the run complete with a closing message.
    fn finish(&self, msg: String);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// A [`NullProgress`] behind the shared handle the pipeline expects.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
