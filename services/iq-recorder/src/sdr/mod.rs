//! RTL-SDR device access
//!
//! Two backends implement the capture device interface:
//! 1. `librtlsdr` - local USB sticks via the native library
//! 2. `rtl_tcp` - a remote stick shared by an `rtl_tcp` server

pub mod device;
mod librtlsdr;
#[cfg(test)]
pub mod mock;
mod rtl_tcp;
pub mod session;

pub use device::{CaptureDevice, DeviceDriver, DeviceError};
pub use librtlsdr::RtlSdrDriver;
pub use rtl_tcp::RtlTcpDriver;
pub use session::CaptureSession;
