//! Driver traits for ergometer access
//!
//! The USB protocol spoken by the performance monitor lives outside this
//! crate. A driver exposes it through two traits:
//!
//! - [`ErgDriver`] enumerates attached monitors and opens one of them
//! - [`ErgHandle`] is an open monitor, good until the device goes away
//!
//! Drivers report recoverable glitches as
//! [`ErgError::Transport`](crate::error::ErgError::Transport) and a vanished
//! device as [`ErgError::Disconnected`](crate::error::ErgError::Disconnected).

use crate::error::Result;
use crate::types::MonitorReading;
use std::collections::VecDeque;

/// USB vendor ID used by Concept2 performance monitors
pub const CONCEPT2_VENDOR_ID: u16 = 0x17a4;

/// Size of the rolling window for recent read times
const RECENT_WINDOW_SIZE: usize = 60;

/// An enumerated, not yet opened, monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Driver specific identifier used to open the device
    pub id: String,
    /// Vendor ID
    pub vendor_id: u16,
    /// Product ID
    pub product_id: u16,
    /// Monitor model (e.g. "PM5")
    pub model: String,
    /// USB serial number (if the descriptor exposes one)
    pub serial_number: Option<String>,
}

impl std::fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref serial) = self.serial_number {
            write!(
                f,
                "{} ({:04x}:{:04x}) - {}",
                self.model, self.vendor_id, self.product_id, serial
            )
        } else {
            write!(
                f,
                "{} ({:04x}:{:04x})",
                self.model, self.vendor_id, self.product_id
            )
        }
    }
}

/// Identity reported by an open monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErgIdentity {
    /// Monitor serial number
    pub serial: String,
    /// Monitor model
    pub model: String,
    /// Firmware version, if reported
    pub firmware: Option<String>,
}

/// Access to attached performance monitors
#[cfg_attr(test, mockall::automock)]
pub trait ErgDriver: Send {
    /// List attached monitors in a stable order
    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>>;

    /// Open the monitor described by `descriptor`
    fn open(&mut self, descriptor: &DeviceDescriptor) -> Result<Box<dyn ErgHandle>>;
}

/// An open performance monitor
#[cfg_attr(test, mockall::automock)]
pub trait ErgHandle: Send {
    /// Query identity information (serial number, model)
    fn identity(&mut self) -> Result<ErgIdentity>;

    /// Query the current monitor snapshot
    fn monitor(&mut self) -> Result<MonitorReading>;
}

/// Statistics for device reads
#[derive(Debug, Clone)]
pub struct DeviceStats {
    /// Total number of successful reads
    pub successful_reads: u64,
    /// Total number of failed read attempts
    pub failed_reads: u64,
    /// Number of successful connects
    pub connects: u64,
    /// Total read time in microseconds
    pub total_read_time_us: u64,
    /// Last read time in microseconds
    pub last_read_time_us: u64,
    /// Rolling window of recent read times
    pub recent_read_times: VecDeque<u64>,
}

impl Default for DeviceStats {
    fn default() -> Self {
        Self {
            successful_reads: 0,
            failed_reads: 0,
            connects: 0,
            total_read_time_us: 0,
            last_read_time_us: 0,
            recent_read_times: VecDeque::with_capacity(RECENT_WINDOW_SIZE),
        }
    }
}

impl DeviceStats {
    /// Calculate average read time in microseconds
    pub fn avg_read_time_us(&self) -> f64 {
        if self.successful_reads == 0 {
            0.0
        } else {
            self.total_read_time_us as f64 / self.successful_reads as f64
        }
    }

    /// Calculate success rate as percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.successful_reads + self.failed_reads;
        if total == 0 {
            100.0
        } else {
            (self.successful_reads as f64 / total as f64) * 100.0
        }
    }

    /// Record a successful read operation
    pub fn record_success(&mut self, time_us: u64) {
        self.successful_reads += 1;
        self.total_read_time_us += time_us;
        self.last_read_time_us = time_us;

        self.recent_read_times.push_back(time_us);
        if self.recent_read_times.len() > RECENT_WINDOW_SIZE {
            self.recent_read_times.pop_front();
        }
    }

    /// Record a failed read attempt
    pub fn record_failure(&mut self) {
        self.failed_reads += 1;
    }

    /// Record a successful connect
    pub fn record_connect(&mut self) {
        self.connects += 1;
    }

    /// Get the recent max read time (from rolling window)
    pub fn recent_max_us(&self) -> u64 {
        self.recent_read_times.iter().max().copied().unwrap_or(0)
    }
}

impl std::fmt::Display for DeviceStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} connects, {}/{} reads ok ({:.1}%), read time last {} / avg {:.0} / recent max {} us",
            self.connects,
            self.successful_reads,
            self.successful_reads + self.failed_reads,
            self.success_rate(),
            self.last_read_time_us,
            self.avg_read_time_us(),
            self.recent_max_us()
        )
    }
}
