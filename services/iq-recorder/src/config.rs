//! Configuration from the command line, with environment fallbacks

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};

use crate::sdr::{DeviceDriver, RtlSdrDriver, RtlTcpDriver};

pub const DEFAULT_SAMPLE_RATE: u32 = 2_048_000;

#[cfg(not(feature = "librtlsdr"))]
const NO_USB_NOTE: &str = "Note: this build has no USB support and only records from rtl_tcp \
(--rtl-tcp HOST:PORT). Rebuild with `--features librtlsdr` for local sticks.";

/// What the capture loop does when a read reports an error status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReadErrorPolicy {
    /// Stop without writing the failed read's bytes
    #[default]
    Stop,
    /// Warn, write whatever bytes were returned and keep going
    Continue,
}

#[derive(Parser, Debug)]
#[command(
    name = "iq-recorder",
    version,
    about = "iq-recorder, an I/Q recorder for RTL2832 based USB-sticks"
)]
#[cfg_attr(not(feature = "librtlsdr"), command(after_help = NO_USB_NOTE))]
pub struct Cli {
    /// Frequency to tune to [Hz]
    #[arg(short = 'f', long = "frequency", env = "IQ_FREQUENCY", default_value_t = 0)]
    pub frequency: u32,

    /// Sample rate [Hz]
    #[arg(
        short = 's',
        long = "samplerate",
        env = "IQ_SAMPLE_RATE",
        default_value_t = DEFAULT_SAMPLE_RATE
    )]
    pub sample_rate: u32,

    /// Device index
    #[arg(short = 'd', long = "device-index", env = "IQ_DEVICE_INDEX", default_value_t = 0)]
    pub device_index: u32,

    /// Record from an rtl_tcp server instead of a local USB stick
    #[arg(long = "rtl-tcp", env = "RTL_TCP_ADDR", value_name = "HOST:PORT")]
    pub rtl_tcp: Option<String>,

    /// Behaviour when a read reports an error
    #[arg(
        long = "on-read-error",
        env = "IQ_READ_ERROR_POLICY",
        value_enum,
        default_value_t = ReadErrorPolicy::Stop
    )]
    pub on_read_error: ReadErrorPolicy,

    /// Output filename
    pub output: PathBuf,
}

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Center frequency in Hz
    pub frequency: u32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// RTL-SDR device index
    pub device_index: u32,

    /// rtl_tcp server address; local USB when unset
    pub rtl_tcp: Option<String>,

    pub read_error_policy: ReadErrorPolicy,

    /// File receiving the raw I/Q stream
    pub output: PathBuf,
}

impl Config {
    /// Parse from the given arguments (first item is the program name)
    #[cfg(test)]
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Cli::try_parse_from(args).map(Self::from)
    }

    /// Parse the process arguments. Bad usage prints the error with usage
    /// and exits with code 1; `--help` and `--version` exit with 0.
    pub fn from_args() -> Self {
        match Cli::try_parse() {
            Ok(cli) => cli.into(),
            Err(e) => match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
                _ => {
                    let _ = e.print();
                    std::process::exit(1);
                }
            },
        }
    }

    /// Driver for the configured backend
    pub fn driver(&self) -> Box<dyn DeviceDriver> {
        match &self.rtl_tcp {
            Some(addr) => Box::new(RtlTcpDriver::new(addr.clone())),
            None => Box::new(RtlSdrDriver::new()),
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            frequency: cli.frequency,
            sample_rate: cli.sample_rate,
            device_index: cli.device_index,
            rtl_tcp: cli.rtl_tcp,
            read_error_policy: cli.on_read_error,
            output: cli.output,
        }
    }
}
