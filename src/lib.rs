//! # ergrace: RowErg monitor logger
//!
//! Polls a Concept2 RowErg performance monitor about once per second and
//! appends every reading to a CSV file. Built for long non-stop rowing events,
//! where the monitor may glitch or drop off the bus. Failed reads are retried
//! and a lost connection is re-established without restarting the log.
//!
//! ## Architecture
//!
//! - **Retry**: [`RetryPolicy`] re-runs an operation on retryable failures
//! - **Device**: [`DeviceSession`] owns one monitor connection, on top of the
//!   [`ErgDriver`](device::ErgDriver) driver traits
//! - **Logger**: [`CsvLogger`] writes the header once, then one row per reading
//! - **Poll loop**: [`PollLoop`] ties them together until interrupted
//!
//! ## Example
//!
//! ```ignore
//! use ergrace::{
//!     config::AppConfig, device, CsvLogger, DeviceSession, PollLoop, ShutdownSignal,
//! };
//!
//! let config = AppConfig::default();
//! let shutdown = ShutdownSignal::new();
//! shutdown.install_ctrl_c_handler()?;
//!
//! let driver = device::driver_from_config(&config)?;
//! let session = DeviceSession::from_config(driver, &config.device, &shutdown);
//! let (path, logger) = CsvLogger::create_in_dir(".", &chrono::Local::now().naive_local())?;
//!
//! PollLoop::new(session, logger, config.poll.clone(), shutdown).run()?;
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod logger;
pub mod poll;
pub mod retry;
pub mod shutdown;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use device::DeviceSession;
pub use error::{ErgError, Result, TransientIoError};
pub use logger::CsvLogger;
pub use poll::PollLoop;
pub use retry::RetryPolicy;
pub use shutdown::ShutdownSignal;
pub use types::{ConnectionStatus, MonitorReading};
