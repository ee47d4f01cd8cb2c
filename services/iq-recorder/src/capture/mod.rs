//! Streaming capture from device to file
//!
//! `record` drives one full session:
//! 1. Enumerate devices and open the configured one
//! 2. Apply sample rate and center frequency (warnings only)
//! 3. Create the output file and reset the device buffers
//! 4. Run the capture loop until cancelled or a short read
//!
//! Device, driver and sink are released by scope on every path out.

mod buffer;
mod runner;
pub mod shutdown;
mod sink;
mod stats;

pub use buffer::SampleBuffer;
pub use runner::{CaptureLoop, CaptureReport};
pub use shutdown::ShutdownFlag;
pub use sink::OutputSink;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::CaptureError;
use crate::sdr::{CaptureSession, DeviceDriver};

/// Record from `driver` into the configured output until stopped
pub fn record(
    config: &Config,
    driver: &dyn DeviceDriver,
    shutdown: &ShutdownFlag,
) -> Result<CaptureReport, CaptureError> {
    let device_count = driver.device_count();
    if device_count == 0 {
        return Err(CaptureError::NoDevices);
    }

    info!("Found {} device(s):", device_count);
    for index in 0..device_count {
        info!("  {}:  {}", index, driver.device_info(index));
    }

    let mut session = CaptureSession::open(driver, config.device_index)?;
    session.configure(config.sample_rate, config.frequency);
    if session.sample_rate().is_none() || session.center_freq().is_none() {
        warn!("Continuing with the device's current settings");
    }

    let mut sink = OutputSink::create(&config.output)?;

    session.reset_buffers();

    let setup_status = session.last_status();
    let mut buffer = SampleBuffer::default();
    info!("Reading samples...");

    let report = CaptureLoop::new(
        session.device_mut(),
        &mut buffer,
        &mut sink,
        shutdown,
        config.read_error_policy,
    )
    .with_initial_status(setup_status)
    .run();

    sink.finish()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::buffer::CHUNK_LEN;
    use super::runner::StopReason;
    use super::*;
    use crate::config::ReadErrorPolicy;
    use crate::sdr::mock::{Call, CallLog, MockDriver, ReadStep, Script};
    use std::path::Path;

    fn config(output: &Path) -> Config {
        Config {
            frequency: 100_000_000,
            sample_rate: 2_048_000,
            device_index: 0,
            rtl_tcp: None,
            read_error_policy: ReadErrorPolicy::Stop,
            output: output.to_path_buf(),
        }
    }

    fn calls(log: &CallLog) -> Vec<Call> {
        log.lock().unwrap().clone()
    }

    fn file_len(path: &Path) -> u64 {
        std::fs::metadata(path).unwrap().len()
    }

    #[test]
    fn test_no_devices_is_fatal_and_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("capture.bin");
        let (driver, log) = MockDriver::new(Script::default());

        let err = record(&config(&output), &driver, &ShutdownFlag::new()).unwrap_err();

        assert!(matches!(err, CaptureError::NoDevices));
        assert_eq!(err.exit_code(), 1);
        assert!(!output.exists());
        assert!(calls(&log).is_empty());
    }

    #[test]
    fn test_open_failure_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("capture.bin");
        let (driver, _log) = MockDriver::new(Script {
            device_count: 1,
            fail_open: true,
            ..Default::default()
        });

        let err = record(&config(&output), &driver, &ShutdownFlag::new()).unwrap_err();

        assert!(matches!(err, CaptureError::DeviceOpen { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_sink_failure_still_closes_device() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("no-such-dir").join("capture.bin");
        let (driver, log) = MockDriver::new(Script {
            device_count: 1,
            ..Default::default()
        });

        let err = record(&config(&output), &driver, &ShutdownFlag::new()).unwrap_err();

        assert!(matches!(err, CaptureError::SinkOpen { .. }));
        let calls = calls(&log);
        assert_eq!(calls.last(), Some(&Call::Close));
        assert!(!calls.iter().any(|c| matches!(c, Call::Read(_))));
    }

    #[test]
    fn test_configuration_precedes_first_read() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("capture.bin");
        let (driver, log) = MockDriver::new(Script {
            device_count: 2,
            reads: vec![ReadStep::full(CHUNK_LEN), ReadStep::full(100)],
            ..Default::default()
        });

        let mut cfg = config(&output);
        cfg.sample_rate = 2_400_000;
        cfg.frequency = 433_920_000;
        let report = record(&cfg, &driver, &ShutdownFlag::new()).unwrap();

        assert_eq!(report.reads, 2);
        assert_eq!(
            calls(&log),
            vec![
                Call::Open(0),
                Call::SetSampleRate(2_400_000),
                Call::SetCenterFreq(433_920_000),
                Call::ResetBuffer,
                Call::Read(CHUNK_LEN),
                Call::Read(CHUNK_LEN),
                Call::Close,
            ]
        );
    }

    #[test]
    fn test_short_read_on_iteration_k_sizes_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("capture.bin");
        let k = 3;
        let short = 12_345;
        let mut reads: Vec<ReadStep> = (1..k).map(|_| ReadStep::full(CHUNK_LEN)).collect();
        reads.push(ReadStep::full(short));
        reads.push(ReadStep::full(CHUNK_LEN));
        let (driver, log) = MockDriver::new(Script {
            device_count: 1,
            reads,
            ..Default::default()
        });

        let report = record(&config(&output), &driver, &ShutdownFlag::new()).unwrap();

        assert_eq!(report.reason, StopReason::ShortRead { len: short });
        assert_eq!(report.exit_code(), 0);
        assert_eq!(file_len(&output), ((k - 1) * CHUNK_LEN + short) as u64);
        let reads = calls(&log).iter().filter(|c| matches!(c, Call::Read(_))).count();
        assert_eq!(reads, k);
    }

    #[test]
    fn test_cancel_before_first_read_leaves_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("capture.bin");
        let (driver, log) = MockDriver::new(Script {
            device_count: 1,
            reads: vec![ReadStep::full(CHUNK_LEN)],
            ..Default::default()
        });
        let shutdown = ShutdownFlag::new();
        shutdown.trigger();

        let report = record(&config(&output), &driver, &shutdown).unwrap();

        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(report.reads, 0);
        assert!(output.exists());
        assert_eq!(file_len(&output), 0);
        assert_eq!(calls(&log).last(), Some(&Call::Close));
    }

    #[test]
    fn test_cancel_after_n_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("capture.bin");
        let shutdown = ShutdownFlag::new();
        let n = 3;
        let mut reads: Vec<ReadStep> = (0..n).map(|_| ReadStep::full(CHUNK_LEN)).collect();
        reads.push(ReadStep::full(CHUNK_LEN).cancelling(&shutdown));
        let (driver, _log) = MockDriver::new(Script {
            device_count: 1,
            reads,
            ..Default::default()
        });

        let report = record(&config(&output), &driver, &shutdown).unwrap();

        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(report.reads, (n + 1) as u64);
        assert_eq!(file_len(&output), report.bytes_written);
        assert!(report.bytes_written <= ((n + 1) * CHUNK_LEN) as u64);
    }

    #[test]
    fn test_exit_code_reflects_setup_status_when_cancelled_early() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("capture.bin");
        let (driver, _log) = MockDriver::new(Script {
            device_count: 1,
            reset_status: -4,
            ..Default::default()
        });
        let shutdown = ShutdownFlag::new();
        shutdown.trigger();

        let report = record(&config(&output), &driver, &shutdown).unwrap();
        assert_eq!(report.exit_code(), 4);
    }

    #[test]
    fn test_truncates_previous_capture() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("capture.bin");
        std::fs::write(&output, vec![0u8; 3 * CHUNK_LEN]).unwrap();
        let (driver, _log) = MockDriver::new(Script {
            device_count: 1,
            reads: vec![ReadStep::full(10)],
            ..Default::default()
        });

        record(&config(&output), &driver, &ShutdownFlag::new()).unwrap();
        assert_eq!(file_len(&output), 10);
    }
}
