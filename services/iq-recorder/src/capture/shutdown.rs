//! Cooperative shutdown on SIGINT, SIGTERM and SIGQUIT

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One-shot cancellation latch shared between the signal listener and the
/// capture loop. There is no way to clear it once set.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Register the termination signals and spawn a task that latches `flag`
/// on delivery. Must be called from within a tokio runtime.
///
/// Handlers are registered before this returns, so a signal arriving any
/// time afterwards is caught rather than killing the process.
#[cfg(unix)]
pub fn install(flag: ShutdownFlag) -> io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = interrupt.recv() => "SIGINT",
                Some(()) = terminate.recv() => "SIGTERM",
                Some(()) = quit.recv() => "SIGQUIT",
                else => break,
            };
            latch(&flag, name);
        }
    }))
}

#[cfg(not(unix))]
pub fn install(flag: ShutdownFlag) -> io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            latch(&flag, "Ctrl-C");
        }
    }))
}

fn latch(flag: &ShutdownFlag, name: &str) {
    if flag.is_set() {
        debug!("Received {} while already stopping", name);
    } else {
        info!("Signal caught ({}), exiting!", name);
    }
    flag.trigger();
}
