//! Retry policies
//!
//! A [`RetryPolicy`] re-invokes a fallible operation while a predicate says
//! the failure is worth retrying. Policies are applied by composition at the
//! call site:
//!
//! ```ignore
//! let policy = RetryPolicy::bounded(10, Duration::from_millis(100)).announced();
//! let reading = policy.run(|| handle.monitor(), ErgError::is_transient)?;
//! ```
//!
//! The delay between attempts is constant. An announced policy reports each
//! failure it is about to retry at `warn` level; the final failure of an
//! exhausted policy is left to the caller. When a [`ShutdownSignal`] is
//! attached, a pending retry is abandoned with [`ErgError::Interrupted`] as
//! soon as shutdown is requested.

use crate::error::{ErgError, Result};
use crate::shutdown::ShutdownSignal;
use std::time::Duration;

/// Rule for re-attempting a failed operation
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt (`None` = unbounded)
    max_retries: Option<u32>,
    /// Pause between attempts (`None` = retry immediately)
    delay: Option<Duration>,
    /// Report failures before retrying them
    announce: bool,
    /// Abandons pending retries when requested
    shutdown: Option<ShutdownSignal>,
}

impl RetryPolicy {
    /// Retry until the operation succeeds or fails non-retryably
    pub fn unbounded(delay: impl Into<Option<Duration>>) -> Self {
        Self {
            max_retries: None,
            delay: delay.into(),
            ..Default::default()
        }
    }

    /// Retry at most `max_retries` times, then return the last failure
    pub fn bounded(max_retries: u32, delay: impl Into<Option<Duration>>) -> Self {
        Self {
            max_retries: Some(max_retries),
            delay: delay.into(),
            ..Default::default()
        }
    }

    /// Report every failure at `warn` level before it is retried
    pub fn announced(mut self) -> Self {
        self.announce = true;
        self
    }

    /// Attach a shutdown signal
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn is_announced(&self) -> bool {
        self.announce
    }

    /// Run `op`, retrying failures for which `is_retryable` returns true
    pub fn run<T, F, P>(&self, mut op: F, is_retryable: P) -> Result<T>
    where
        F: FnMut() -> Result<T>,
        P: Fn(&ErgError) -> bool,
    {
        let mut retries: u32 = 0;

        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    if self.max_retries.is_some_and(|max| retries >= max) {
                        tracing::debug!("Giving up after {} retries: {}", retries, e);
                        return Err(e);
                    }
                    retries += 1;
                    self.report(&e, retries);

                    if !self.wait() {
                        return Err(ErgError::Interrupted);
                    }
                }
            }
        }
    }

    fn report(&self, error: &ErgError, retry: u32) {
        if !self.announce {
            tracing::trace!("Retry {} after: {}", retry, error);
            return;
        }
        match self.max_retries {
            Some(max) => tracing::warn!("{} (retry {}/{})", error, retry, max),
            None => tracing::warn!("{} (retry {})", error, retry),
        }
    }

    /// Pause before the next attempt; false if shutdown was requested
    fn wait(&self) -> bool {
        match (&self.shutdown, self.delay) {
            (Some(shutdown), Some(delay)) => shutdown.sleep(delay),
            (Some(shutdown), None) => !shutdown.is_requested(),
            (None, Some(delay)) => {
                std::thread::sleep(delay);
                true
            }
            (None, None) => true,
        }
    }
}
