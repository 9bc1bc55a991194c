//! Signal handling for graceful shutdown.
//!
//! Ctrl+C (and SIGTERM/SIGHUP via ctrlc's `termination` feature) sets a
//! shared `AtomicBool`. The `watch` command blocks on
//! [`ShutdownHandler::wait`] and then stops the monitor, which lets an
//! in-flight quarantine finish and releases the instance lock. The
//! `log --follow` viewer polls the same flag.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dupeguard::signal::install_handler;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! handler.wait();
//! println!("Stopping...");
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

const WAIT_TICK: Duration = Duration::from_millis(100);

/// Shared shutdown flag.
///
/// Cloning shares the flag, so a clone can be moved into another thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a new shutdown handler with the flag initially set to `false`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Manually request a shutdown.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the underlying flag.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Reset the shutdown flag to `false`.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Block until shutdown is requested.
    pub fn wait(&self) {
        while !self.is_shutdown_requested() {
            thread::sleep(WAIT_TICK);
        }
    }

    /// Block until shutdown is requested or `timeout` elapses.
    ///
    /// Returns `true` if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_shutdown_requested() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(WAIT_TICK.min(deadline - now));
        }
        true
    }
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),

    /// Ctrl+C is already routed to code outside this crate.
    #[error("a Ctrl+C handler is already registered elsewhere in this process")]
    ForeignHandler,
}

static GLOBAL_HANDLER: Mutex<Option<ShutdownHandler>> = Mutex::new(None);

/// Install a Ctrl+C handler that sets the shutdown flag on interrupt.
///
/// The OS hook can only be registered once per process. Later calls reset
/// and return the already installed handler, so `run_app` can be called
/// repeatedly (and concurrently) from tests.
///
/// # Errors
///
/// Returns [`SignalError::ForeignHandler`] if something else already owns
/// Ctrl+C, since a flag nobody sets would make `watch` wait forever, or
/// [`SignalError::InstallFailed`] if the hook cannot be registered.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    let mut installed = GLOBAL_HANDLER
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(handler) = installed.as_ref() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(std::io::stderr(), "\nStopping monitor...");
        let _ = std::io::stderr().flush();
        log::info!("Shutdown signal received");
    }) {
        Ok(()) => {
            *installed = Some(handler.clone());
            Ok(handler)
        }
        Err(ctrlc::Error::MultipleHandlers) => {
            log::warn!("Ctrl+C is already handled elsewhere; refusing to wait on an unhooked flag");
            Err(SignalError::ForeignHandler)
        }
        Err(e) => Err(SignalError::InstallFailed(e)),
    }
}
