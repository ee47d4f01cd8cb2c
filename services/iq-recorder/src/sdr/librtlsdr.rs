//! Local USB sticks through the native librtlsdr
//!
//! Linking requires the `librtlsdr` cargo feature. Without it the driver
//! still exists but never finds any hardware.

#[cfg(not(feature = "librtlsdr"))]
use super::device::{CaptureDevice, DeviceDriver, DeviceError, DeviceInfo};

/// Driver for RTL2832 sticks attached over USB
#[derive(Debug, Default)]
pub struct RtlSdrDriver {
    _private: (),
}

impl RtlSdrDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(not(feature = "librtlsdr"))]
impl DeviceDriver for RtlSdrDriver {
    fn device_count(&self) -> u32 {
        tracing::warn!(
            "Built without librtlsdr support, no USB devices available (rebuild with --features librtlsdr or use --rtl-tcp)"
        );
        0
    }

    fn device_info(&self, _index: u32) -> DeviceInfo {
        DeviceInfo::default()
    }

    fn open(&self, _index: u32) -> Result<Box<dyn CaptureDevice>, DeviceError> {
        Err(DeviceError::Unsupported("built without librtlsdr support"))
    }
}

#[cfg(feature = "librtlsdr")]
mod native {
    use std::ffi::CStr;
    use std::os::raw::{c_char, c_int, c_void};
    use std::ptr;

    use tracing::{debug, warn};

    use super::RtlSdrDriver;
    use crate::sdr::device::{
        sanitize_string, CaptureDevice, DeviceDriver, DeviceError, DeviceInfo, Transfer,
    };

    #[allow(non_camel_case_types)]
    #[repr(C)]
    pub struct rtlsdr_dev {
        _opaque: [u8; 0],
    }

    // librtlsdr requires 256-byte buffers for each USB string
    const USB_STRING_LEN: usize = 256;

    #[link(name = "rtlsdr")]
    extern "C" {
        fn rtlsdr_get_device_count() -> u32;
        fn rtlsdr_get_device_name(index: u32) -> *const c_char;
        fn rtlsdr_get_device_usb_strings(
            index: u32,
            manufact: *mut c_char,
            product: *mut c_char,
            serial: *mut c_char,
        ) -> c_int;
        fn rtlsdr_open(dev: *mut *mut rtlsdr_dev, index: u32) -> c_int;
        fn rtlsdr_close(dev: *mut rtlsdr_dev) -> c_int;
        fn rtlsdr_set_sample_rate(dev: *mut rtlsdr_dev, rate: u32) -> c_int;
        fn rtlsdr_set_center_freq(dev: *mut rtlsdr_dev, freq: u32) -> c_int;
        fn rtlsdr_reset_buffer(dev: *mut rtlsdr_dev) -> c_int;
        fn rtlsdr_read_sync(
            dev: *mut rtlsdr_dev,
            buf: *mut c_void,
            len: c_int,
            n_read: *mut c_int,
        ) -> c_int;
    }

    fn check(status: c_int) -> Result<(), DeviceError> {
        if status < 0 {
            Err(DeviceError::Status(status))
        } else {
            Ok(())
        }
    }

    fn usb_string(raw: &[c_char; USB_STRING_LEN]) -> Option<String> {
        // SAFETY: librtlsdr NUL-terminates within the buffer; the buffer
        // starts zeroed so an untouched one is an empty C string.
        let s = unsafe { CStr::from_ptr(raw.as_ptr()) };
        let s = sanitize_string(&s.to_string_lossy());
        (!s.is_empty()).then_some(s)
    }

    impl DeviceDriver for RtlSdrDriver {
        fn device_count(&self) -> u32 {
            // SAFETY: no preconditions
            unsafe { rtlsdr_get_device_count() }
        }

        fn device_info(&self, index: u32) -> DeviceInfo {
            // SAFETY: returns a static string or NULL for an unknown index
            let name_ptr = unsafe { rtlsdr_get_device_name(index) };
            let name = if name_ptr.is_null() {
                String::new()
            } else {
                // SAFETY: non-null pointer to a static NUL-terminated string
                sanitize_string(&unsafe { CStr::from_ptr(name_ptr) }.to_string_lossy())
            };

            let mut manufacturer = [0 as c_char; USB_STRING_LEN];
            let mut product = [0 as c_char; USB_STRING_LEN];
            let mut serial = [0 as c_char; USB_STRING_LEN];

            // SAFETY: each buffer is USB_STRING_LEN bytes as the API requires
            let status = unsafe {
                rtlsdr_get_device_usb_strings(
                    index,
                    manufacturer.as_mut_ptr(),
                    product.as_mut_ptr(),
                    serial.as_mut_ptr(),
                )
            };
            if status < 0 {
                debug!("Could not read USB strings for device {}: {}", index, status);
                return DeviceInfo {
                    name,
                    ..Default::default()
                };
            }

            DeviceInfo {
                name,
                manufacturer: usb_string(&manufacturer),
                product: usb_string(&product),
                serial: usb_string(&serial),
            }
        }

        fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, DeviceError> {
            let mut dev: *mut rtlsdr_dev = ptr::null_mut();
            // SAFETY: `dev` is a valid out-pointer
            check(unsafe { rtlsdr_open(&mut dev, index) })?;
            if dev.is_null() {
                return Err(DeviceError::NoSuchDevice(index));
            }
            Ok(Box::new(RtlSdrDevice { dev }))
        }
    }

    /// Opened librtlsdr handle, closed on drop
    pub struct RtlSdrDevice {
        dev: *mut rtlsdr_dev,
    }

    // The handle is only ever used by the thread that currently owns it.
    unsafe impl Send for RtlSdrDevice {}

    impl CaptureDevice for RtlSdrDevice {
        fn set_sample_rate(&mut self, rate: u32) -> Result<(), DeviceError> {
            // SAFETY: `dev` is an open handle for the lifetime of self
            check(unsafe { rtlsdr_set_sample_rate(self.dev, rate) })
        }

        fn set_center_freq(&mut self, freq: u32) -> Result<(), DeviceError> {
            // SAFETY: as above
            check(unsafe { rtlsdr_set_center_freq(self.dev, freq) })
        }

        fn reset_buffer(&mut self) -> Result<(), DeviceError> {
            // SAFETY: as above
            check(unsafe { rtlsdr_reset_buffer(self.dev) })
        }

        fn read_sync(&mut self, buf: &mut [u8]) -> Transfer {
            let len = c_int::try_from(buf.len()).unwrap_or(c_int::MAX);
            let mut n_read: c_int = 0;
            // SAFETY: `buf` is writable for `len` bytes and `n_read` is a
            // valid out-pointer
            let status = unsafe {
                rtlsdr_read_sync(self.dev, buf.as_mut_ptr().cast(), len, &mut n_read)
            };
            let n_read = usize::try_from(n_read).unwrap_or(0).min(buf.len());
            match check(status) {
                Ok(()) => Transfer::complete(n_read),
                Err(e) => Transfer::failed(n_read, e),
            }
        }
    }

    impl Drop for RtlSdrDevice {
        fn drop(&mut self) {
            // SAFETY: `dev` was opened by rtlsdr_open and is closed once here
            let status = unsafe { rtlsdr_close(self.dev) };
            if status < 0 {
                warn!("Failed to close rtlsdr device: {}", status);
            }
        }
    }
}
