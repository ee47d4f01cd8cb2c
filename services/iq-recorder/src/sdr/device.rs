//! Capture device interface shared by all SDR backends

use std::fmt;

use thiserror::Error;

/// Error reported by a driver or an opened device
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Negative status code returned by the driver
    #[cfg(any(feature = "librtlsdr", test))]
    #[error("driver returned status {0}")]
    Status(i32),

    #[error("no device at index {0}")]
    NoSuchDevice(u32),

    #[cfg(not(feature = "librtlsdr"))]
    #[error("{0}")]
    Unsupported(&'static str),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    /// Status code in driver convention (always negative)
    pub fn status(&self) -> i32 {
        match self {
            #[cfg(any(feature = "librtlsdr", test))]
            DeviceError::Status(code) if *code < 0 => *code,
            #[cfg(any(feature = "librtlsdr", test))]
            DeviceError::Status(code) => -code.abs().max(1),
            DeviceError::Io(e) => -e.raw_os_error().unwrap_or(1).abs().max(1),
            _ => -1,
        }
    }
}

/// Outcome of one synchronous read.
///
/// A failed read may still have transferred some bytes, so the length is
/// reported alongside the status rather than inside it.
#[derive(Debug)]
pub struct Transfer {
    pub len: usize,
    pub status: Result<(), DeviceError>,
}

impl Transfer {
    pub fn complete(len: usize) -> Self {
        Self { len, status: Ok(()) }
    }

    pub fn failed(len: usize, error: DeviceError) -> Self {
        Self {
            len,
            status: Err(error),
        }
    }

    /// Status code of the read, 0 on success
    pub fn status_code(&self) -> i32 {
        match &self.status {
            Ok(()) => 0,
            Err(e) => e.status(),
        }
    }
}

/// Descriptive strings for an enumerated device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial: Option<String>,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.manufacturer, &self.product, &self.serial) {
            (None, None, None) => write!(f, "{}", self.name),
            (mfr, prd, sn) => write!(
                f,
                "{}, {}, SN: {}",
                mfr.as_deref().unwrap_or("Unknown"),
                prd.as_deref().unwrap_or(&self.name),
                sn.as_deref().unwrap_or("-"),
            ),
        }
    }
}

/// Sanitize a string to only contain printable ASCII characters
#[cfg(any(feature = "librtlsdr", test))]
pub fn sanitize_string(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Process-wide access to a family of capture devices.
///
/// Constructing a driver brings the backend up; dropping it tears it down.
pub trait DeviceDriver: Send {
    fn device_count(&self) -> u32;

    fn device_info(&self, index: u32) -> DeviceInfo;

    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, DeviceError>;
}

/// An opened device handle. Dropping it closes the device.
pub trait CaptureDevice: Send {
    fn set_sample_rate(&mut self, rate: u32) -> Result<(), DeviceError>;

    fn set_center_freq(&mut self, freq: u32) -> Result<(), DeviceError>;

    /// Flush the device's internal transfer buffers
    fn reset_buffer(&mut self) -> Result<(), DeviceError>;

    /// Blocking read of up to `buf.len()` bytes
    fn read_sync(&mut self, buf: &mut [u8]) -> Transfer;
}
