// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Hardware access behind small synchronous traits.
//!
//! The service only talks to fans, sensors and the profile source through
//! [`FanDriver`], [`SensorDriver`] and [`ProfileDriver`]. The concrete
//! implementations are thin wrappers around sysfs/procfs files.

pub mod hwmon;
pub mod platform;
pub mod thinkpad;

use crate::config::{FanConfig, FanType, ProfileConfig, ProfileType, SensorConfig, SensorType};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

pub use hwmon::HwmonSensor;
pub use platform::PlatformProfile;
pub use thinkpad::ThinkpadFan;

/// Defaults a fan driver suggests for its fan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverDefaults {
    /// Level handing control back to the firmware
    pub level: String,
    /// How often an unchanged level has to be rewritten
    pub repeat: Duration,
}

#[cfg_attr(test, mockall::automock)]
pub trait FanDriver {
    fn init(&self) -> io::Result<()>;
    fn set_level(&self, level: &str) -> io::Result<()>;
    fn defaults(&self) -> DriverDefaults;
}

#[cfg_attr(test, mockall::automock)]
pub trait SensorDriver {
    fn init(&mut self) -> io::Result<()>;
    fn value(&self) -> io::Result<f64>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ProfileDriver {
    fn init(&self) -> io::Result<()>;
    fn state(&self) -> io::Result<String>;
}

// ---------------------------------------------------------------------------
// Construction from config
// ---------------------------------------------------------------------------

pub fn create_fan(conf: &FanConfig) -> Box<dyn FanDriver> {
    match conf.kind {
        FanType::Thinkpad => Box::new(ThinkpadFan::new(conf)),
    }
}

pub fn create_sensors(confs: &[SensorConfig]) -> BTreeMap<String, Box<dyn SensorDriver>> {
    confs
        .iter()
        .map(|conf| {
            let driver: Box<dyn SensorDriver> = match conf.kind {
                SensorType::Hwmon => Box::new(HwmonSensor::new(conf)),
            };
            (conf.name.clone(), driver)
        })
        .collect()
}

pub fn create_profile(conf: Option<&ProfileConfig>) -> Option<Box<dyn ProfileDriver>> {
    conf.map(|conf| -> Box<dyn ProfileDriver> {
        match conf.kind {
            ProfileType::Platform => Box::new(PlatformProfile::new(conf)),
        }
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read a sysfs attribute with surrounding whitespace removed.
pub fn read_sys_file(path: &Path) -> io::Result<String> {
    fs::read_to_string(path).map(|s| s.trim().to_string())
}
