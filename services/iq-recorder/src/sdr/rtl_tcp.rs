//! Remote sticks served by `rtl_tcp`
//!
//! The server greets each client with a 12-byte dongle header and then
//! streams raw 8-bit I/Q until the connection closes. Tuning is done with
//! 5-byte commands: one opcode byte followed by a big-endian u32.

use std::io::{self, Read, Write};
use std::net::TcpStream;

use tracing::{debug, info};

use super::device::{CaptureDevice, DeviceDriver, DeviceError, DeviceInfo, Transfer};

const DONGLE_MAGIC: &[u8; 4] = b"RTL0";
const HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Command {
    SetFrequency = 0x01,
    SetSampleRate = 0x02,
}

/// Tuner name for the type code in the dongle header
fn tuner_name(code: u32) -> &'static str {
    match code {
        1 => "E4000",
        2 => "FC0012",
        3 => "FC0013",
        4 => "FC2580",
        5 => "R820T",
        6 => "R828D",
        _ => "unknown",
    }
}

/// Driver exposing a single `rtl_tcp` endpoint as device 0
#[derive(Debug, Clone)]
pub struct RtlTcpDriver {
    addr: String,
}

impl RtlTcpDriver {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl DeviceDriver for RtlTcpDriver {
    fn device_count(&self) -> u32 {
        1
    }

    fn device_info(&self, _index: u32) -> DeviceInfo {
        DeviceInfo {
            name: format!("rtl_tcp {}", self.addr),
            ..Default::default()
        }
    }

    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, DeviceError> {
        if index != 0 {
            return Err(DeviceError::NoSuchDevice(index));
        }
        Ok(Box::new(RtlTcpDevice::connect(&self.addr)?))
    }
}

/// Open connection to an `rtl_tcp` server
#[derive(Debug)]
pub struct RtlTcpDevice {
    stream: TcpStream,
}

impl RtlTcpDevice {
    pub fn connect(addr: &str) -> Result<Self, DeviceError> {
        info!("Connecting to rtl_tcp at {}", addr);
        let mut stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        let mut header = [0u8; HEADER_LEN];
        stream.read_exact(&mut header)?;
        if &header[..4] != DONGLE_MAGIC {
            return Err(DeviceError::Protocol(format!(
                "bad dongle header magic {:02X?}",
                &header[..4]
            )));
        }

        let tuner_type = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        let gain_count = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        info!(
            "Connected: tuner {} ({} gain steps)",
            tuner_name(tuner_type),
            gain_count
        );

        Ok(Self { stream })
    }

    fn send(&mut self, command: Command, param: u32) -> Result<(), DeviceError> {
        let mut packet = [0u8; 5];
        packet[0] = command as u8;
        packet[1..].copy_from_slice(&param.to_be_bytes());
        debug!("rtl_tcp command {:?} {}", command, param);
        self.stream.write_all(&packet)?;
        Ok(())
    }
}

impl CaptureDevice for RtlTcpDevice {
    fn set_sample_rate(&mut self, rate: u32) -> Result<(), DeviceError> {
        self.send(Command::SetSampleRate, rate)
    }

    fn set_center_freq(&mut self, freq: u32) -> Result<(), DeviceError> {
        self.send(Command::SetFrequency, freq)
    }

    fn reset_buffer(&mut self) -> Result<(), DeviceError> {
        // Nothing to flush, the server starts streaming on connect
        Ok(())
    }

    fn read_sync(&mut self, buf: &mut [u8]) -> Transfer {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Transfer::failed(filled, e.into()),
            }
        }
        Transfer::complete(filled)
    }
}
