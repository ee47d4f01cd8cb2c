//! Running counters for the capture loop

use std::time::{Duration, Instant};

use tracing::info;

const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Statistics for one capture run
#[derive(Debug)]
pub struct CaptureStats {
    started: Instant,
    reads: u64,
    bytes: u64,
    read_errors: u64,
    last_report: Instant,
    bytes_at_last_report: u64,
}

impl CaptureStats {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            reads: 0,
            bytes: 0,
            read_errors: 0,
            last_report: now,
            bytes_at_last_report: 0,
        }
    }

    pub fn record_read(&mut self, len: usize, failed: bool) {
        self.reads += 1;
        self.bytes += len as u64;
        if failed {
            self.read_errors += 1;
        }
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn read_errors(&self) -> u64 {
        self.read_errors
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Log throughput if the report interval has passed
    pub fn maybe_report(&mut self) {
        let elapsed = self.last_report.elapsed();
        if elapsed < REPORT_INTERVAL {
            return;
        }

        let delta = self.bytes - self.bytes_at_last_report;
        info!(
            "[Capture] Rate: {:.2} MSPS | Chunks: {} | Bytes: {} | Read errors: {}",
            samples_per_sec(delta, elapsed) / 1_000_000.0,
            self.reads,
            self.bytes,
            self.read_errors
        );

        self.last_report = Instant::now();
        self.bytes_at_last_report = self.bytes;
    }
}

impl Default for CaptureStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Complex samples per second for a byte count (one I and one Q byte each)
pub fn samples_per_sec(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes / 2) as f64 / secs
    } else {
        0.0
    }
}
