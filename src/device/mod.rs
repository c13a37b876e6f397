//! Device access
//!
//! # Components
//!
//! - [`ErgDriver`] / [`ErgHandle`] - traits a device driver implements
//! - [`DeviceSession`] - connection to one monitor with built-in retries
//! - [`SimulatedDriver`] - simulated rower for running without hardware
//!   (feature-gated)
//!
//! # Enabling the simulator
//!
//! The simulator is part of the default `simulator` feature:
//!
//! ```bash
//! cargo run --no-default-features   # builds without the simulated driver
//! ```

pub mod driver;
pub mod session;
#[cfg(feature = "simulator")]
pub mod simulated;

pub use driver::{
    DeviceDescriptor, DeviceStats, ErgDriver, ErgHandle, ErgIdentity, CONCEPT2_VENDOR_ID,
};
pub use session::DeviceSession;
#[cfg(feature = "simulator")]
pub use simulated::{SimulatedDriver, SimulatedHandle};

use crate::config::{AppConfig, DriverKind};
use crate::error::Result;

/// Build the driver selected in the configuration
pub fn driver_from_config(config: &AppConfig) -> Result<Box<dyn ErgDriver>> {
    match config.device.driver {
        #[cfg(feature = "simulator")]
        DriverKind::Simulated => Ok(Box::new(SimulatedDriver::new(config.simulator.clone()))),
        #[cfg(not(feature = "simulator"))]
        DriverKind::Simulated => Err(crate::error::ErgError::Config(
            "the simulated driver is not compiled in (enable the `simulator` feature)"
                .to_string(),
        )),
    }
}
