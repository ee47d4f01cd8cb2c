//! IQ Recorder - raw I/Q capture from RTL-SDR
//!
//! Streams unsigned 8-bit I/Q samples from an RTL2832 stick (local USB or
//! rtl_tcp) into a file until interrupted or the device stops delivering
//! full chunks.

mod capture;
mod config;
mod error;
mod sdr;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use capture::{shutdown, ShutdownFlag};
use config::Config;

#[tokio::main]
async fn main() {
    // Initialize logging (stderr, so stdout stays free)
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_args();

    let code = match run(config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };

    std::process::exit(code);
}

async fn run(config: Config) -> Result<i32> {
    info!("===========================================");
    info!("   IQ Recorder - RTL-SDR raw sample capture");
    info!("===========================================");
    info!("Configuration:");
    match &config.rtl_tcp {
        Some(addr) => info!("  Source: rtl_tcp {}", addr),
        None => info!("  Source: USB device #{}", config.device_index),
    }
    info!("  Center frequency: {} Hz", config.frequency);
    info!("  Sample rate: {} S/s", config.sample_rate);
    info!("  On read error: {:?}", config.read_error_policy);
    info!("  Output: {}", config.output.display());

    let shutdown_flag = ShutdownFlag::new();
    let signals = shutdown::install(shutdown_flag.clone())
        .context("Failed to install signal handlers")?;

    let driver = config.driver();
    let outcome = tokio::task::spawn_blocking(move || {
        capture::record(&config, &*driver, &shutdown_flag)
    })
    .await
    .context("Capture thread panicked")?;

    signals.abort();

    match outcome {
        Ok(report) => {
            info!(
                "Done: {} chunks, {} bytes written (status {})",
                report.chunks_written, report.bytes_written, report.last_status
            );
            Ok(report.exit_code())
        }
        Err(e) => {
            error!("{}", e);
            Ok(e.exit_code())
        }
    }
}
