//! Monotonic timing for sequences and phases.

use std::time::{Duration, Instant};

/// Captures a start instant and measures durations against it.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed since this timer started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Offset of this timer's start from an earlier timer's start.
    pub fn start_relative_to(&self, earlier: &Timer) -> Duration {
        self.start.saturating_duration_since(earlier.start)
    }
}
