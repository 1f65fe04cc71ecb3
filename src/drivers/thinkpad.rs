// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! ThinkPad ACPI fan (`/proc/acpi/ibm/fan`).
//!
//! Accepts `level 0`..`level 7`, `level auto`, `level full-speed` and
//! `level disengaged`. The firmware reverts to automatic control when the
//! watchdog expires, hence the periodic repeat.

use super::{DriverDefaults, FanDriver};
use crate::config::FanConfig;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

const ACPI_FAN_PATH: &str = "/proc/acpi/ibm/fan";

#[derive(Debug, Clone)]
pub struct ThinkpadFan {
    path: PathBuf,
    prefix: &'static str,
}

impl ThinkpadFan {
    pub fn new(conf: &FanConfig) -> Self {
        Self {
            path: conf
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from(ACPI_FAN_PATH)),
            prefix: if conf.raw_level { "" } else { "level " },
        }
    }
}

impl FanDriver for ThinkpadFan {
    fn init(&self) -> io::Result<()> {
        File::open(&self.path).map(drop)
    }

    fn set_level(&self, level: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(format!("{}{level}", self.prefix).as_bytes())
    }

    fn defaults(&self) -> DriverDefaults {
        DriverDefaults {
            level: "auto".to_string(),
            repeat: Duration::from_secs(60),
        }
    }
}
