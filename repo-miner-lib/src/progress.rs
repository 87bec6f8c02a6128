/// A trait for reporting progress of long-running operations.
pub trait Progress: Send + Sync {
    /// Set the phase label for the current operation (e.g., "Cloning", "Analyzing").
    fn set_phase(&self, phase: &str);

    /// Report how far the current phase has come.
    fn set_position(&self, current: u64, total: u64, message: &str);

    /// Print a line above the progress indicator.
    fn println(&self, line: &str);

    /// Finish and clear the progress indicator.
    fn done(&self);
}

/// Progress sink that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn set_phase(&self, _phase: &str) {}
    fn set_position(&self, _current: u64, _total: u64, _message: &str) {}
    fn println(&self, _line: &str) {}
    fn done(&self) {}
}
