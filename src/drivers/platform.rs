// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! ACPI platform profile (`low-power`, `balanced`, `performance`, ...).

use super::{ProfileDriver, read_sys_file};
use crate::config::ProfileConfig;
use std::io;
use std::path::PathBuf;

const PLATFORM_PROFILE_PATH: &str = "/sys/firmware/acpi/platform_profile";

#[derive(Debug, Clone)]
pub struct PlatformProfile {
    path: PathBuf,
}

impl PlatformProfile {
    pub fn new(conf: &ProfileConfig) -> Self {
        Self {
            path: conf
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from(PLATFORM_PROFILE_PATH)),
        }
    }
}

impl ProfileDriver for PlatformProfile {
    fn init(&self) -> io::Result<()> {
        if !self.path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {}", self.path.display()),
            ));
        }
        Ok(())
    }

    fn state(&self) -> io::Result<String> {
        read_sys_file(&self.path)
    }
}
