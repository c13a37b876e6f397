//! Core data types for ergrace
//!
//! # Main Types
//!
//! - [`MonitorReading`] - One snapshot of the performance monitor
//! - [`ConnectionStatus`] - State of the device session

/// Names of the monitor columns, in CSV order
pub const MONITOR_FIELDS: [&str; 5] = ["time", "distance", "spm", "power", "pace"];

/// One snapshot of the RowErg performance monitor
///
/// Produced once per poll tick and never modified afterwards. Two readings
/// compare equal only if every field is identical, which is what the
/// skip-unchanged mode relies on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonitorReading {
    /// Elapsed workout time in seconds
    pub time: f64,
    /// Distance rowed in meters
    pub distance: f64,
    /// Stroke rate in strokes per minute
    pub spm: u32,
    /// Power in watts
    pub power: u32,
    /// Pace in seconds per 500 m
    pub pace: f64,
}

impl MonitorReading {
    /// Create a new reading
    pub fn new(time: f64, distance: f64, spm: u32, power: u32, pace: f64) -> Self {
        Self {
            time,
            distance,
            spm,
            power,
            pace,
        }
    }

    /// Render the fields as text, in [`MONITOR_FIELDS`] order
    pub fn fields(&self) -> [String; 5] {
        [
            self.time.to_string(),
            self.distance.to_string(),
            self.spm.to_string(),
            self.power.to_string(),
            self.pace.to_string(),
        ]
    }
}

/// Represents the connection status to the ergometer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not connected to any device
    #[default]
    Disconnected,
    /// Waiting for a device to appear
    Connecting,
    /// Connected and ready
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
        }
    }
}
