// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! hwmon temperature sensor.
//!
//! Scans `/sys/class/hwmon/` for devices whose `name` matches the configured
//! chip and collects every `tempN_input` whose `tempN_label` matches the
//! configured label. A reading is the selected value over all of them.

use super::{SensorDriver, read_sys_file};
use crate::config::SensorConfig;
use crate::select::Select;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const HWMON_ROOT: &str = "/sys/class/hwmon";
const DEFAULT_CHIP: &str = "coretemp";
/// hwmon reports millidegrees Celsius.
const DEFAULT_FACTOR: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct HwmonSensor {
    root: PathBuf,
    chip: String,
    label: Option<String>,
    factor: f64,
    add: f64,
    select: Select,
    inputs: Vec<PathBuf>,
}

impl HwmonSensor {
    pub fn new(conf: &SensorConfig) -> Self {
        Self {
            root: conf
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from(HWMON_ROOT)),
            chip: conf
                .sensor
                .clone()
                .unwrap_or_else(|| DEFAULT_CHIP.to_string()),
            label: conf.label.clone(),
            factor: conf.factor.unwrap_or(DEFAULT_FACTOR),
            add: conf.add.unwrap_or_default(),
            select: conf.select,
            inputs: Vec::new(),
        }
    }

    /// Input files found by the last [`SensorDriver::init`].
    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    fn discover_inputs(&self, hwmon_dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut inputs = Vec::new();

        for entry in fs::read_dir(hwmon_dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(stem) = file_name.strip_suffix("_label") else {
                continue;
            };
            if entry.file_type()?.is_dir() {
                continue;
            }

            if let Some(wanted) = &self.label {
                let label = read_sys_file(&entry.path())?;
                if !label.contains(wanted.as_str()) {
                    continue;
                }
            }

            let input_path = hwmon_dir.join(format!("{stem}_input"));
            if input_path.exists() {
                inputs.push(input_path);
            }
        }
        Ok(inputs)
    }
}

impl SensorDriver for HwmonSensor {
    fn init(&mut self) -> io::Result<()> {
        let mut inputs = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let hwmon_dir = entry.path();
            let name_path = hwmon_dir.join("name");
            if !name_path.exists() {
                continue;
            }
            let hwmon_name = read_sys_file(&name_path)?;
            if !hwmon_name.contains(self.chip.as_str()) {
                continue;
            }
            inputs.extend(self.discover_inputs(&hwmon_dir)?);
        }

        if inputs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no '{}' inputs found in {}", self.chip, self.root.display()),
            ));
        }

        inputs.sort();
        log::debug!("Sensor '{}' inputs: {:?}", self.chip, inputs);
        self.inputs = inputs;
        Ok(())
    }

    fn value(&self) -> io::Result<f64> {
        let mut values = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let raw = read_sys_file(input)?;
            let value: f64 = raw.parse().map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("parse {}: {e}", input.display()),
                )
            })?;
            values.push(value * self.factor + self.add);
        }
        Ok(self.select.apply(&values))
    }
}
