//! Fatal recorder errors

use std::path::PathBuf;

use thiserror::Error;

use crate::sdr::DeviceError;

/// Errors that stop the recorder before (or right after) the capture loop.
/// Each maps to exit code 1.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No supported devices found.")]
    NoDevices,

    #[error("Failed to open rtlsdr device #{index}: {source}")]
    DeviceOpen { index: u32, source: DeviceError },

    #[error("Failed to open {}: {source}", path.display())]
    SinkOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to close {}: {source}", path.display())]
    SinkClose {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CaptureError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}
