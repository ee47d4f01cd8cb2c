//! Capture session - one opened, configured device

use tracing::{debug, info, warn};

use crate::error::CaptureError;

use super::device::{CaptureDevice, DeviceDriver};

/// Exclusive owner of an opened device handle.
///
/// Configuration failures are absorbed here: they are logged and the device
/// keeps whatever value it held before.
pub struct CaptureSession {
    index: u32,
    device: Box<dyn CaptureDevice>,
    sample_rate: Option<u32>,
    center_freq: Option<u32>,
    last_status: i32,
}

impl CaptureSession {
    /// Open device `index`. Failure is fatal and leaves nothing open.
    pub fn open(driver: &dyn DeviceDriver, index: u32) -> Result<Self, CaptureError> {
        let info = driver.device_info(index);
        info!("Using device {}: {}", index, info.name);

        let device = driver
            .open(index)
            .map_err(|source| CaptureError::DeviceOpen { index, source })?;

        Ok(Self {
            index,
            device,
            sample_rate: None,
            center_freq: None,
            last_status: 0,
        })
    }

    /// Apply sample rate, then center frequency. Each is attempted exactly once.
    pub fn configure(&mut self, sample_rate: u32, center_freq: u32) {
        match self.device.set_sample_rate(sample_rate) {
            Ok(()) => {
                info!("Sampling at {} S/s.", sample_rate);
                self.sample_rate = Some(sample_rate);
                self.last_status = 0;
            }
            Err(e) => {
                warn!("Failed to set sample rate: {}", e);
                self.last_status = e.status();
            }
        }

        match self.device.set_center_freq(center_freq) {
            Ok(()) => {
                info!("Tuned to {} Hz.", center_freq);
                self.center_freq = Some(center_freq);
                self.last_status = 0;
            }
            Err(e) => {
                warn!("Failed to set center freq: {}", e);
                self.last_status = e.status();
            }
        }
    }

    /// Flush stale samples out of the device before streaming
    pub fn reset_buffers(&mut self) {
        match self.device.reset_buffer() {
            Ok(()) => self.last_status = 0,
            Err(e) => {
                warn!("Failed to reset buffers: {}", e);
                self.last_status = e.status();
            }
        }
    }

    pub fn device_mut(&mut self) -> &mut dyn CaptureDevice {
        self.device.as_mut()
    }

    /// Sample rate accepted by the device, if setting it succeeded
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    pub fn center_freq(&self) -> Option<u32> {
        self.center_freq
    }

    /// Status of the most recent device operation, 0 on success
    pub fn last_status(&self) -> i32 {
        self.last_status
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        debug!("Closing device {}", self.index);
    }
}
