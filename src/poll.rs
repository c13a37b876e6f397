//! Poll loop
//!
//! [`PollLoop::run`] connects, then reads the monitor and logs the reading
//! once per interval until interrupted:
//!
//! ```text
//! connect ─► read ─► write row ─► sleep ─┐
//!              ▲                         │
//!              └─────────────────────────┘
//! ```
//!
//! Short glitches are absorbed by the session's read retries. When a failure
//! is connection-level (the monitor vanished, or a glitch outlasted the read
//! retries) the session is dropped and the outer reconnect policy starts over
//! with a fresh connect. The CSV logger lives outside the session, so the
//! header is never repeated after a reconnect.

use crate::config::PollConfig;
use crate::device::DeviceSession;
use crate::error::{ErgError, Result};
use crate::logger::CsvLogger;
use crate::shutdown::ShutdownSignal;
use std::io::Write;

/// Drives a device session and a CSV logger
pub struct PollLoop<W: Write> {
    session: DeviceSession,
    logger: CsvLogger<W>,
    config: PollConfig,
    shutdown: ShutdownSignal,
    /// Completed polls, skipped readings included
    ticks: u64,
}

impl<W: Write> PollLoop<W> {
    pub fn new(
        session: DeviceSession,
        logger: CsvLogger<W>,
        config: PollConfig,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            session,
            logger,
            config,
            shutdown,
            ticks: 0,
        }
    }

    /// Poll until interrupted (or until `max_ticks` polls completed)
    ///
    /// An interrupt is a clean exit and returns `Ok(())`.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!(
            "Polling every {} ms{}",
            self.config.interval_ms,
            if self.config.skip_unchanged {
                ", skipping unchanged readings"
            } else {
                ""
            }
        );

        let policy = self.config.reconnect_policy(&self.shutdown);
        let result = policy.run(|| self.run_session(), ErgError::is_connection_level);

        tracing::info!(
            "Stopped after {} polls: {} rows written, {}",
            self.ticks,
            self.logger.rows_written(),
            self.session.stats()
        );

        match result {
            Err(e) if e.is_interrupted() => Ok(()),
            other => other,
        }
    }

    /// One session: connect if needed, then poll until done or failed
    fn run_session(&mut self) -> Result<()> {
        let result = self.poll_session();
        if let Err(ref e) = result {
            if e.is_connection_level() {
                self.session.disconnect();
            }
        }
        result
    }

    fn poll_session(&mut self) -> Result<()> {
        if self.finished() {
            return Ok(());
        }
        if !self.session.is_connected() {
            let serial = self.session.connect()?;
            println!("Connected to RowErg with serial {}", serial);
            if let Some(descriptor) = self.session.descriptor() {
                tracing::info!("Polling {}", descriptor);
            }
        }

        loop {
            if self.shutdown.is_requested() {
                return Err(ErgError::Interrupted);
            }
            if self.finished() {
                return Ok(());
            }

            self.tick()?;

            if self.finished() {
                return Ok(());
            }
            if !self.shutdown.sleep(self.config.interval()) {
                return Err(ErgError::Interrupted);
            }
        }
    }

    /// Read once and log the reading, if any
    ///
    /// Returns the row written, or `None` for a skipped unchanged reading.
    pub fn tick(&mut self) -> Result<Option<Vec<String>>> {
        let reading = self.session.read_snapshot(self.config.skip_unchanged)?;
        self.ticks += 1;

        let Some(reading) = reading else {
            tracing::trace!("Unchanged reading skipped");
            return Ok(None);
        };

        // Nothing new goes to the file once shutdown was requested
        if self.shutdown.is_requested() {
            return Err(ErgError::Interrupted);
        }

        let row = self.logger.write_reading(&reading)?;
        println!("{}", row.join(", "));
        Ok(Some(row))
    }

    fn finished(&self) -> bool {
        self.config.max_ticks.is_some_and(|max| self.ticks >= max)
    }

    /// Completed polls so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub fn logger(&self) -> &CsvLogger<W> {
        &self.logger
    }

    pub fn into_logger(self) -> CsvLogger<W> {
        self.logger
    }
}
