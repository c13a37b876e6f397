//! Simulated rower
//!
//! A driver producing plausible monitor data without hardware attached. A
//! steady rower is simulated from the configured pace and stroke rate; power
//! follows the Concept2 relation `watts = 2.80 / (pace / 500)^3`.
//!
//! Two faults can be injected to exercise the recovery paths:
//!
//! - `fail_every`: every n-th monitor read fails with a transient error
//! - `reset_after_meters`: once the distance is reached the monitor drops off
//!   the bus, stays invisible for `offline_enumerations` enumerations and
//!   then comes back with a fresh workout
//!
//! # Time
//!
//! [`SimulatedDriver::new`] follows the wall clock. [`SimulatedDriver::stepped`]
//! advances the workout by a fixed step on every successful read instead,
//! which keeps test runs deterministic.

use crate::config::SimulatorConfig;
use crate::device::driver::{
    DeviceDescriptor, ErgDriver, ErgHandle, ErgIdentity, CONCEPT2_VENDOR_ID,
};
use crate::error::{ErgError, Result, TransientIoError};
use crate::types::MonitorReading;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Product ID reported for simulated monitors
pub const SIMULATED_PRODUCT_ID: u16 = 0x0003;

#[derive(Debug)]
enum Clock {
    Wall(Instant),
    Stepped { step_secs: f64, elapsed_secs: f64 },
}

impl Clock {
    fn elapsed_secs(&self) -> f64 {
        match self {
            Clock::Wall(origin) => origin.elapsed().as_secs_f64(),
            Clock::Stepped { elapsed_secs, .. } => *elapsed_secs,
        }
    }

    fn advance(&mut self) {
        if let Clock::Stepped {
            step_secs,
            elapsed_secs,
        } = self
        {
            *elapsed_secs += *step_secs;
        }
    }

    fn restart(&mut self) {
        match self {
            Clock::Wall(origin) => *origin = Instant::now(),
            Clock::Stepped { elapsed_secs, .. } => *elapsed_secs = 0.0,
        }
    }
}

#[derive(Debug)]
struct RowerState {
    clock: Clock,
    online: bool,
    offline_remaining: u32,
    /// Bumped on every reset; handles from older generations are dead
    generation: u64,
    reads: u64,
}

fn lock(state: &Mutex<RowerState>) -> MutexGuard<'_, RowerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Driver for simulated monitors
pub struct SimulatedDriver {
    config: SimulatorConfig,
    state: Arc<Mutex<RowerState>>,
}

impl SimulatedDriver {
    /// Create a simulator following the wall clock
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_clock(config, Clock::Wall(Instant::now()))
    }

    /// Create a simulator advancing `step_secs` per successful read
    pub fn stepped(config: SimulatorConfig, step_secs: f64) -> Self {
        Self::with_clock(
            config,
            Clock::Stepped {
                step_secs,
                elapsed_secs: 0.0,
            },
        )
    }

    fn with_clock(config: SimulatorConfig, clock: Clock) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(RowerState {
                clock,
                online: true,
                offline_remaining: 0,
                generation: 0,
                reads: 0,
            })),
        }
    }

    fn serial_for(&self, index: usize) -> String {
        if index == 0 {
            self.config.serial.clone()
        } else {
            format!("{}-{}", self.config.serial, index)
        }
    }
}

impl ErgDriver for SimulatedDriver {
    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>> {
        let mut state = lock(&self.state);

        if !state.online {
            if state.offline_remaining > 0 {
                state.offline_remaining -= 1;
                return Ok(Vec::new());
            }
            state.online = true;
            state.clock.restart();
            tracing::debug!("Simulated monitor back online");
        }

        Ok((0..self.config.devices)
            .map(|i| DeviceDescriptor {
                id: format!("sim:{}", i),
                vendor_id: CONCEPT2_VENDOR_ID,
                product_id: SIMULATED_PRODUCT_ID,
                model: "PM5 (simulated)".to_string(),
                serial_number: Some(self.serial_for(i)),
            })
            .collect())
    }

    fn open(&mut self, descriptor: &DeviceDescriptor) -> Result<Box<dyn ErgHandle>> {
        let state = lock(&self.state);
        if !state.online {
            return Err(ErgError::Disconnected(format!(
                "{} is not attached",
                descriptor.id
            )));
        }

        let serial = descriptor
            .serial_number
            .clone()
            .unwrap_or_else(|| self.config.serial.clone());

        Ok(Box::new(SimulatedHandle {
            serial,
            generation: state.generation,
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// An open simulated monitor
pub struct SimulatedHandle {
    serial: String,
    generation: u64,
    config: SimulatorConfig,
    state: Arc<Mutex<RowerState>>,
}

impl SimulatedHandle {
    fn check_alive(&self, state: &RowerState) -> Result<()> {
        if !state.online || state.generation != self.generation {
            return Err(ErgError::Disconnected(format!(
                "monitor {} is gone",
                self.serial
            )));
        }
        Ok(())
    }
}

impl ErgHandle for SimulatedHandle {
    fn identity(&mut self) -> Result<ErgIdentity> {
        let state = lock(&self.state);
        self.check_alive(&state)?;

        Ok(ErgIdentity {
            serial: self.serial.clone(),
            model: "PM5".to_string(),
            firmware: Some("sim".to_string()),
        })
    }

    fn monitor(&mut self) -> Result<MonitorReading> {
        let mut state = lock(&self.state);
        self.check_alive(&state)?;

        state.reads += 1;
        if let Some(every) = self.config.fail_every {
            if every > 0 && state.reads % every == 0 {
                return Err(TransientIoError::new("monitor", "simulated glitch").into());
            }
        }

        let pace = self.config.pace_secs;
        let elapsed = state.clock.elapsed_secs();
        let distance = round_tenth(elapsed / pace * 500.0);

        if let Some(limit) = self.config.reset_after_meters {
            if distance >= limit {
                state.online = false;
                state.offline_remaining = self.config.offline_enumerations;
                state.generation += 1;
                tracing::debug!("Simulated monitor reset at {} m", distance);
                return Err(ErgError::Disconnected("monitor reset".to_string()));
            }
        }

        state.clock.advance();

        let power = (2.80 / (pace / 500.0).powi(3)).round() as u32;
        Ok(MonitorReading::new(
            round_tenth(elapsed),
            distance,
            self.config.spm,
            power,
            pace,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stepped(config: SimulatorConfig) -> SimulatedDriver {
        SimulatedDriver::stepped(config, 1.0)
    }

    #[test]
    fn test_enumerates_configured_devices() {
        let mut driver = stepped(SimulatorConfig {
            devices: 2,
            ..Default::default()
        });

        let devices = driver.enumerate().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial_number.as_deref(), Some("430000001"));
        assert_eq!(devices[1].serial_number.as_deref(), Some("430000001-1"));
        assert!(devices.iter().all(|d| d.vendor_id == CONCEPT2_VENDOR_ID));
    }

    #[test]
    fn test_readings_advance_with_pace() {
        let mut driver = stepped(SimulatorConfig::default());
        let descriptor = driver.enumerate().unwrap().remove(0);
        let mut handle = driver.open(&descriptor).unwrap();

        assert_eq!(handle.identity().unwrap().serial, "430000001");

        let first = handle.monitor().unwrap();
        let second = handle.monitor().unwrap();
        assert_eq!(first.time, 0.0);
        assert_eq!(second.time, 1.0);
        // 120 s / 500 m
        assert!((second.distance - 4.2).abs() < 1e-9);
        assert_eq!(second.spm, 22);
        assert_eq!(second.power, 203);
        assert_eq!(second.pace, 120.0);
    }

    #[test]
    fn test_fail_every_injects_transient_errors() {
        let mut driver = stepped(SimulatorConfig {
            fail_every: Some(3),
            ..Default::default()
        });
        let descriptor = driver.enumerate().unwrap().remove(0);
        let mut handle = driver.open(&descriptor).unwrap();

        assert!(handle.monitor().is_ok());
        assert!(handle.monitor().is_ok());
        assert!(handle.monitor().unwrap_err().is_transient());
        assert!(handle.monitor().is_ok());
    }

    #[test]
    fn test_reset_drops_device_then_recovers() {
        let mut driver = stepped(SimulatorConfig {
            pace_secs: 100.0,
            reset_after_meters: Some(10.0),
            offline_enumerations: 2,
            ..Default::default()
        });
        let descriptor = driver.enumerate().unwrap().remove(0);
        let mut handle = driver.open(&descriptor).unwrap();

        // 5 m per step: 0, 5, then 10 triggers the reset
        assert!(handle.monitor().is_ok());
        assert!(handle.monitor().is_ok());
        let err = handle.monitor().unwrap_err();
        assert!(matches!(err, ErgError::Disconnected(_)));

        // Old handle stays dead
        assert!(matches!(handle.monitor(), Err(ErgError::Disconnected(_))));
        assert!(driver.open(&descriptor).is_err());

        assert!(driver.enumerate().unwrap().is_empty());
        assert!(driver.enumerate().unwrap().is_empty());
        let descriptor = driver.enumerate().unwrap().remove(0);

        let mut handle = driver.open(&descriptor).unwrap();
        let reading = handle.monitor().unwrap();
        assert_eq!(reading.distance, 0.0);
        assert_eq!(reading.time, 0.0);
    }
}
