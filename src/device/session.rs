//! Device session
//!
//! A [`DeviceSession`] owns the connection to one monitor. It is either
//! disconnected or connected; a connected session holds the open handle and
//! the serial number fetched when connecting.
//!
//! Both device operations run under their own [`RetryPolicy`]:
//!
//! - `connect` waits for a monitor to appear, retrying only
//!   [`ErgError::DeviceNotFound`], normally without a bound
//! - `read_snapshot` rides out short glitches, retrying only transient
//!   transport errors, normally 10 times 100 ms apart
//!
//! Anything else is returned to the caller, which decides whether to rebuild
//! the session.

use crate::config::DeviceConfig;
use crate::device::driver::{DeviceDescriptor, DeviceStats, ErgDriver, ErgHandle};
use crate::error::{ErgError, Result};
use crate::retry::RetryPolicy;
use crate::shutdown::ShutdownSignal;
use crate::types::{ConnectionStatus, MonitorReading};
use std::time::Instant;

/// Connection to one ergometer
pub struct DeviceSession {
    /// Driver used to find and open monitors
    driver: Box<dyn ErgDriver>,
    /// Open monitor, present only while connected
    handle: Option<Box<dyn ErgHandle>>,
    /// Descriptor of the open monitor
    descriptor: Option<DeviceDescriptor>,
    /// Serial number fetched at connect time
    serial_number: Option<String>,
    /// Previous reading, for skip-unchanged
    last_reading: Option<MonitorReading>,
    status: ConnectionStatus,
    connect_policy: RetryPolicy,
    read_policy: RetryPolicy,
    stats: DeviceStats,
}

impl DeviceSession {
    /// Create a disconnected session
    pub fn new(
        driver: Box<dyn ErgDriver>,
        connect_policy: RetryPolicy,
        read_policy: RetryPolicy,
    ) -> Self {
        Self {
            driver,
            handle: None,
            descriptor: None,
            serial_number: None,
            last_reading: None,
            status: ConnectionStatus::Disconnected,
            connect_policy,
            read_policy,
            stats: DeviceStats::default(),
        }
    }

    /// Create a disconnected session with policies from the config
    pub fn from_config(
        driver: Box<dyn ErgDriver>,
        config: &DeviceConfig,
        shutdown: &ShutdownSignal,
    ) -> Self {
        Self::new(
            driver,
            config.connect_policy(shutdown),
            config.read_policy(shutdown),
        )
    }

    /// Connect to the first enumerated monitor
    ///
    /// Blocks while no monitor is attached. Returns the serial number of the
    /// monitor connected to.
    pub fn connect(&mut self) -> Result<&str> {
        if self.handle.is_some() {
            self.disconnect();
        }
        self.set_status(ConnectionStatus::Connecting);

        let policy = self.connect_policy.clone();
        let result = policy.run(|| self.try_connect(), ErgError::is_device_not_found);

        match result {
            Ok(()) => {
                self.set_status(ConnectionStatus::Connected);
                self.stats.record_connect();
                Ok(self.serial_number.as_deref().unwrap_or_default())
            }
            Err(e) => {
                self.set_status(ConnectionStatus::Disconnected);
                // Connection-level failures are reported by the reconnecting caller
                if !e.is_interrupted() && !e.is_connection_level() {
                    tracing::error!("Failed to connect: {}", e);
                }
                Err(e)
            }
        }
    }

    fn try_connect(&mut self) -> Result<()> {
        let devices = self.driver.enumerate()?;
        if devices.len() > 1 {
            tracing::warn!(
                "Multiple Concept2 RowErgs connected ({}). Using the first one only.",
                devices.len()
            );
        }
        let descriptor = devices
            .into_iter()
            .next()
            .ok_or_else(|| ErgError::DeviceNotFound(String::new()))?;

        let mut handle = self.driver.open(&descriptor)?;
        let identity = handle.identity()?;
        tracing::info!("Opened {} (serial {})", descriptor, identity.serial);

        self.handle = Some(handle);
        self.descriptor = Some(descriptor);
        self.serial_number = Some(identity.serial);
        self.last_reading = None;
        Ok(())
    }

    /// Drop the open monitor, if any
    pub fn disconnect(&mut self) {
        if self.handle.take().is_some() {
            tracing::info!(
                "Disconnected from RowErg {}",
                self.serial_number.as_deref().unwrap_or("?")
            );
        }
        self.descriptor = None;
        self.serial_number = None;
        self.set_status(ConnectionStatus::Disconnected);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            tracing::debug!("Session: {} -> {}", self.status, status);
            self.status = status;
        }
    }

    /// Serial number of the connected monitor
    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    /// Read the current monitor snapshot
    ///
    /// With `skip_unchanged`, a snapshot identical to the previous one yields
    /// `Ok(None)`.
    pub fn read_snapshot(&mut self, skip_unchanged: bool) -> Result<Option<MonitorReading>> {
        let policy = self.read_policy.clone();
        let reading = policy.run(|| self.read_once(), ErgError::is_transient)?;

        if skip_unchanged && self.last_reading == Some(reading) {
            return Ok(None);
        }
        self.last_reading = Some(reading);
        Ok(Some(reading))
    }

    fn read_once(&mut self) -> Result<MonitorReading> {
        let handle = self.handle.as_mut().ok_or(ErgError::NotConnected)?;

        let start = Instant::now();
        match handle.monitor() {
            Ok(reading) => {
                self.stats
                    .record_success(start.elapsed().as_micros() as u64);
                Ok(reading)
            }
            Err(e) => {
                self.stats.record_failure();
                Err(e)
            }
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Descriptor of the connected monitor
    pub fn descriptor(&self) -> Option<&DeviceDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn stats(&self) -> &DeviceStats {
        &self.stats
    }
}
