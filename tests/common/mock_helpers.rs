//! Scripted driver for integration tests
//!
//! Monitor reads replay a fixed list of [`Step`]s. The driver can be cloned
//! before it is handed to a session; clones share the script, so the test
//! keeps a handle for inspecting enumeration and open counts afterwards.

use ergrace::device::{DeviceDescriptor, ErgDriver, ErgHandle, ErgIdentity, CONCEPT2_VENDOR_ID};
use ergrace::{ErgError, MonitorReading, Result, TransientIoError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One scripted monitor read
#[derive(Debug, Clone)]
pub enum Step {
    /// Return this reading
    Read(MonitorReading),
    /// Fail with a transient error
    Glitch,
    /// Fail as if the cable was pulled; the device stays enumerable
    Unplug,
}

#[derive(Debug, Default)]
struct Script {
    steps: VecDeque<Step>,
    serials: Vec<String>,
    empty_enumerations: usize,
    enumerations: usize,
    opens: usize,
    reads: usize,
}

#[derive(Debug, Clone)]
pub struct ScriptedDriver {
    script: Arc<Mutex<Script>>,
}

impl ScriptedDriver {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                steps: steps.into_iter().collect(),
                serials: vec!["430000042".to_string()],
                ..Default::default()
            })),
        }
    }

    /// Script from plain readings
    pub fn reading(readings: impl IntoIterator<Item = MonitorReading>) -> Self {
        Self::new(readings.into_iter().map(Step::Read))
    }

    /// Find nothing on the first `count` enumerations
    pub fn with_empty_enumerations(self, count: usize) -> Self {
        self.script.lock().unwrap().empty_enumerations = count;
        self
    }

    /// Enumerate one device per serial, in order
    pub fn with_devices(self, serials: &[&str]) -> Self {
        self.script.lock().unwrap().serials = serials.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn enumerations(&self) -> usize {
        self.script.lock().unwrap().enumerations
    }

    pub fn opens(&self) -> usize {
        self.script.lock().unwrap().opens
    }

    pub fn reads(&self) -> usize {
        self.script.lock().unwrap().reads
    }

    pub fn remaining_steps(&self) -> usize {
        self.script.lock().unwrap().steps.len()
    }
}

impl ErgDriver for ScriptedDriver {
    fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>> {
        let mut script = self.script.lock().unwrap();
        script.enumerations += 1;

        if script.empty_enumerations > 0 {
            script.empty_enumerations -= 1;
            return Ok(Vec::new());
        }

        Ok(script
            .serials
            .iter()
            .enumerate()
            .map(|(i, serial)| DeviceDescriptor {
                id: format!("scripted:{}", i),
                vendor_id: CONCEPT2_VENDOR_ID,
                product_id: 0x0003,
                model: "PM5".to_string(),
                serial_number: Some(serial.clone()),
            })
            .collect())
    }

    fn open(&mut self, descriptor: &DeviceDescriptor) -> Result<Box<dyn ErgHandle>> {
        self.script.lock().unwrap().opens += 1;

        Ok(Box::new(ScriptedHandle {
            serial: descriptor.serial_number.clone().unwrap_or_default(),
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedHandle {
    serial: String,
    script: Arc<Mutex<Script>>,
}

impl ErgHandle for ScriptedHandle {
    fn identity(&mut self) -> Result<ErgIdentity> {
        Ok(ErgIdentity {
            serial: self.serial.clone(),
            model: "PM5".to_string(),
            firmware: None,
        })
    }

    fn monitor(&mut self) -> Result<MonitorReading> {
        let mut script = self.script.lock().unwrap();
        script.reads += 1;

        match script.steps.pop_front() {
            Some(Step::Read(reading)) => Ok(reading),
            Some(Step::Glitch) => Err(TransientIoError::new("monitor", "scripted glitch").into()),
            Some(Step::Unplug) => Err(ErgError::Disconnected("scripted unplug".to_string())),
            None => Err(ErgError::Config("script exhausted".to_string())),
        }
    }
}
