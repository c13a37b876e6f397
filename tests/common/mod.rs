//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use ergrace::config::{DeviceConfig, PollConfig};
use std::path::Path;

/// Device config without delays
pub fn fast_device_config() -> DeviceConfig {
    DeviceConfig {
        connect_retry_delay_ms: 0,
        read_retry_delay_ms: 0,
        ..Default::default()
    }
}

/// Poll config without delays, stopping after `max_ticks` polls
pub fn fast_poll_config(max_ticks: u64, skip_unchanged: bool) -> PollConfig {
    PollConfig {
        interval_ms: 0,
        skip_unchanged,
        reconnect_delay_ms: 0,
        max_ticks: Some(max_ticks),
    }
}

/// Read a CSV log back as rows of fields
pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(path)
        .expect("log file readable")
        .lines()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}
