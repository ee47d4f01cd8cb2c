//! Streaming capture loop
//!
//! Two states, Running and Stopped. Each step checks the shutdown flag,
//! performs one blocking read of a full buffer and forwards exactly the
//! bytes read to the sink. A short read is the end of the stream.

use std::io::Write;

use tracing::{error, info, warn};

use crate::config::ReadErrorPolicy;
use crate::sdr::CaptureDevice;

use super::buffer::SampleBuffer;
use super::shutdown::ShutdownFlag;
use super::sink::OutputSink;
use super::stats::{samples_per_sec, CaptureStats};

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown flag observed at the top of an iteration
    Cancelled,
    /// A read returned fewer bytes than requested; that chunk was written
    ShortRead { len: usize },
    /// A read failed under `ReadErrorPolicy::Stop`; nothing was written for it
    ReadFailed { status: i32 },
    /// The sink rejected a write
    SinkFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

/// Summary of a finished capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub reads: u64,
    pub chunks_written: u64,
    pub bytes_written: u64,
    pub reason: StopReason,
    /// Status of the last device operation, 0 on success
    pub last_status: i32,
}

impl CaptureReport {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self.reason {
            StopReason::SinkFailed => 1,
            _ => self.last_status.unsigned_abs().min(i32::MAX as u32) as i32,
        }
    }
}

pub struct CaptureLoop<'a, D: CaptureDevice + ?Sized, W: Write> {
    device: &'a mut D,
    buffer: &'a mut SampleBuffer,
    sink: &'a mut OutputSink<W>,
    shutdown: &'a ShutdownFlag,
    policy: ReadErrorPolicy,
    state: LoopState,
    last_status: i32,
    stats: CaptureStats,
}

impl<'a, D: CaptureDevice + ?Sized, W: Write> CaptureLoop<'a, D, W> {
    pub fn new(
        device: &'a mut D,
        buffer: &'a mut SampleBuffer,
        sink: &'a mut OutputSink<W>,
        shutdown: &'a ShutdownFlag,
        policy: ReadErrorPolicy,
    ) -> Self {
        Self {
            device,
            buffer,
            sink,
            shutdown,
            policy,
            state: LoopState::Running,
            last_status: 0,
            stats: CaptureStats::new(),
        }
    }

    /// Status carried over from device setup, reported if no read happens
    pub fn with_initial_status(mut self, status: i32) -> Self {
        self.last_status = status;
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run one iteration. Once stopped, further calls do nothing.
    pub fn step(&mut self) -> LoopState {
        if let LoopState::Stopped(_) = self.state {
            return self.state;
        }

        if self.shutdown.is_set() {
            return self.stop(StopReason::Cancelled);
        }

        let capacity = self.buffer.capacity();
        let transfer = self.device.read_sync(self.buffer.as_mut_slice());
        let len = transfer.len.min(capacity);
        self.last_status = transfer.status_code();
        self.stats.record_read(len, transfer.status.is_err());

        if let Err(e) = &transfer.status {
            warn!("Sync read failed: {} ({} bytes returned)", e, len);
            if self.policy == ReadErrorPolicy::Stop {
                return self.stop(StopReason::ReadFailed {
                    status: self.last_status,
                });
            }
        }

        if let Err(e) = self.sink.write_chunk(self.buffer.filled(len)) {
            error!("Failed to write to {}: {}", self.sink.path().display(), e);
            return self.stop(StopReason::SinkFailed);
        }

        if len < capacity {
            info!("Short read, samples lost, exiting!");
            return self.stop(StopReason::ShortRead { len });
        }

        self.stats.maybe_report();
        LoopState::Running
    }

    /// Step until stopped
    pub fn run(mut self) -> CaptureReport {
        let reason = loop {
            if let LoopState::Stopped(reason) = self.step() {
                break reason;
            }
        };

        let report = CaptureReport {
            reads: self.stats.reads(),
            chunks_written: self.sink.chunks_written(),
            bytes_written: self.sink.bytes_written(),
            reason,
            last_status: self.last_status,
        };

        let elapsed = self.stats.elapsed();
        info!(
            "Capture stopped ({:?}) after {:.1}s: {} reads ({} failed), {} bytes written, avg {:.2} MSPS",
            report.reason,
            elapsed.as_secs_f64(),
            report.reads,
            self.stats.read_errors(),
            report.bytes_written,
            samples_per_sec(report.bytes_written, elapsed) / 1_000_000.0
        );

        report
    }

    fn stop(&mut self, reason: StopReason) -> LoopState {
        self.state = LoopState::Stopped(reason);
        self.state
    }
}
