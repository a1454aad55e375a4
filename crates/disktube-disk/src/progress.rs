//! Coarse download progress tracking.

/// Bytes between progress log lines.
pub const PROGRESS_LOG_INTERVAL: u64 = 10 * 1024 * 1024;

/// Monotonic threshold tracker for coarse progress logging.
///
/// Reports a crossing whenever cumulative bytes pass the next interval
/// boundary, regardless of chunk alignment. A single large chunk that
/// jumps several boundaries reports once and re-arms past the current
/// total, so log volume stays bounded on any chunk size.
#[derive(Debug)]
pub struct ProgressThreshold {
    interval: u64,
    transferred: u64,
    next_mark: u64,
}

impl ProgressThreshold {
    /// Create a tracker with the standard 10 MiB interval.
    pub fn new() -> Self {
        Self::with_interval(PROGRESS_LOG_INTERVAL)
    }

    /// Create a tracker with a custom interval.
    pub fn with_interval(interval: u64) -> Self {
        Self {
            interval,
            transferred: 0,
            next_mark: interval,
        }
    }

    /// Record `bytes` more transferred; returns true when a boundary was
    /// crossed and a progress line should be emitted.
    pub fn add(&mut self, bytes: u64) -> bool {
        self.transferred += bytes;
        if self.transferred >= self.next_mark {
            while self.next_mark <= self.transferred {
                self.next_mark += self.interval;
            }
            true
        } else {
            false
        }
    }

    /// Total bytes recorded so far.
    pub fn transferred(&self) -> u64 {
        self.transferred
    }
}

impl Default for ProgressThreshold {
    fn default() -> Self {
        Self::new()
    }
}
