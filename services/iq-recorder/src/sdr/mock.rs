//! Scripted in-memory driver for exercising the capture path in tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::device::{CaptureDevice, DeviceDriver, DeviceError, DeviceInfo, Transfer};
use crate::capture::ShutdownFlag;

/// Every interaction with the scripted device, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open(u32),
    SetSampleRate(u32),
    SetCenterFreq(u32),
    ResetBuffer,
    Read(usize),
    Close,
}

/// Scripted response for one read
#[derive(Debug, Clone)]
pub struct ReadStep {
    pub len: usize,
    pub status: i32,
    /// Trigger this flag while the read is in flight
    pub cancel: Option<ShutdownFlag>,
}

impl ReadStep {
    pub fn full(len: usize) -> Self {
        Self {
            len,
            status: 0,
            cancel: None,
        }
    }

    pub fn failed(len: usize, status: i32) -> Self {
        Self {
            len,
            status,
            cancel: None,
        }
    }

    pub fn cancelling(mut self, flag: &ShutdownFlag) -> Self {
        self.cancel = Some(flag.clone());
        self
    }
}

#[derive(Debug, Default, Clone)]
pub struct Script {
    pub device_count: u32,
    pub fail_open: bool,
    pub sample_rate_status: i32,
    pub center_freq_status: i32,
    pub reset_status: i32,
    pub reads: Vec<ReadStep>,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub struct MockDriver {
    script: Script,
    log: CallLog,
}

impl MockDriver {
    pub fn new(script: Script) -> (Self, CallLog) {
        let log = CallLog::default();
        (
            Self {
                script,
                log: log.clone(),
            },
            log,
        )
    }
}

impl DeviceDriver for MockDriver {
    fn device_count(&self) -> u32 {
        self.script.device_count
    }

    fn device_info(&self, index: u32) -> DeviceInfo {
        DeviceInfo {
            name: format!("Mock RTL2832U #{}", index),
            ..Default::default()
        }
    }

    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, DeviceError> {
        if self.script.fail_open || index >= self.script.device_count {
            return Err(DeviceError::Status(-1));
        }
        self.log.lock().unwrap().push(Call::Open(index));
        Ok(Box::new(MockDevice::new(&self.script, self.log.clone())))
    }
}

/// Device whose reads follow the script; every read past the end of the
/// script returns zero bytes.
pub struct MockDevice {
    script: Script,
    reads: VecDeque<ReadStep>,
    counter: u8,
    log: CallLog,
}

impl MockDevice {
    pub fn new(script: &Script, log: CallLog) -> Self {
        Self {
            script: script.clone(),
            reads: script.reads.iter().cloned().collect(),
            counter: 0,
            log,
        }
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }

    fn status(code: i32) -> Result<(), DeviceError> {
        if code < 0 {
            Err(DeviceError::Status(code))
        } else {
            Ok(())
        }
    }
}

impl CaptureDevice for MockDevice {
    fn set_sample_rate(&mut self, rate: u32) -> Result<(), DeviceError> {
        self.record(Call::SetSampleRate(rate));
        Self::status(self.script.sample_rate_status)
    }

    fn set_center_freq(&mut self, freq: u32) -> Result<(), DeviceError> {
        self.record(Call::SetCenterFreq(freq));
        Self::status(self.script.center_freq_status)
    }

    fn reset_buffer(&mut self) -> Result<(), DeviceError> {
        self.record(Call::ResetBuffer);
        Self::status(self.script.reset_status)
    }

    fn read_sync(&mut self, buf: &mut [u8]) -> Transfer {
        self.record(Call::Read(buf.len()));
        let step = self.reads.pop_front().unwrap_or_else(|| ReadStep::full(0));
        if let Some(flag) = &step.cancel {
            flag.trigger();
        }

        // Distinct, predictable bytes so ordering can be checked in the sink
        let len = step.len.min(buf.len());
        for byte in &mut buf[..len] {
            *byte = self.counter;
            self.counter = self.counter.wrapping_add(1);
        }

        match Self::status(step.status) {
            Ok(()) => Transfer::complete(len),
            Err(e) => Transfer::failed(len, e),
        }
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.record(Call::Close);
    }
}
