//! Interrupt handling
//!
//! A [`ShutdownSignal`] is a shared flag checked by the poll loop and the
//! retry delays. Sleeping goes through [`ShutdownSignal::sleep`], which wakes
//! up in short slices so a Ctrl-C is noticed quickly even during a long delay.

use crate::error::{ErgError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Exit status after a forced shutdown (128 + SIGINT)
pub const FORCED_EXIT_CODE: i32 = 130;

/// Shared shutdown flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask everything holding this signal to stop
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Record an interrupt; true if shutdown had already been requested
    pub fn interrupt(&self) -> bool {
        self.requested.swap(true, Ordering::SeqCst)
    }

    /// Whether shutdown has been requested
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless shutdown is requested first
    ///
    /// Returns `false` if the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }

    /// Spawn a watcher thread that requests shutdown on Ctrl-C
    ///
    /// A second Ctrl-C exits the process right away with
    /// [`FORCED_EXIT_CODE`], for a loop stuck inside a blocking driver call.
    pub fn install_ctrl_c_handler(&self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()
            .map_err(|e| ErgError::Io(e).with_context("Failed to start signal runtime"))?;
        let signal = self.clone();

        std::thread::Builder::new()
            .name("ctrl-c".to_string())
            .spawn(move || loop {
                if let Err(e) = runtime.block_on(tokio::signal::ctrl_c()) {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    signal.request();
                    return;
                }
                if signal.interrupt() {
                    tracing::warn!("Second interrupt, exiting immediately");
                    std::process::exit(FORCED_EXIT_CODE);
                }
                tracing::info!("Interrupt received, shutting down (Ctrl-C again to force)");
            })
            .map_err(|e| ErgError::Io(e).with_context("Failed to spawn signal thread"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_completes_without_request() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();
        assert!(signal.sleep(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_sleep_cut_short_by_request() {
        let signal = ShutdownSignal::new();
        let remote = signal.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            remote.request();
        });

        let start = Instant::now();
        assert!(!signal.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_second_interrupt_is_detected() {
        let signal = ShutdownSignal::new();
        let watcher = signal.clone();

        assert!(!watcher.interrupt());
        assert!(signal.is_requested());
        assert!(watcher.interrupt());
        assert!(signal.interrupt());
    }

    #[test]
    fn test_requested_signal_skips_sleep() {
        let signal = ShutdownSignal::new();
        signal.request();
        assert!(signal.is_requested());
        assert!(!signal.sleep(Duration::ZERO));
    }
}
