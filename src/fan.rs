// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! A controlled fan: its band tables, sensor selection and write policy.

use crate::config::{FanConfig, ProfileLevelsConfig};
use crate::drivers::FanDriver;
use crate::error::{Error, Result};
use crate::levels::Levels;
use crate::select::Select;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Settings resolved from the driver and the fan's config.
///
/// Config wins over driver defaults. Delays are only defaults for bands
/// that don't set their own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanDefaults {
    pub level: String,
    pub suspend_level: String,
    pub repeat: Duration,
    pub delay_up: Option<Duration>,
    pub delay_down: Option<Duration>,
}

impl FanDefaults {
    pub fn new(driver: &dyn FanDriver, conf: &FanConfig) -> Self {
        let driver_defaults = driver.defaults();
        let level = conf.level.clone().unwrap_or(driver_defaults.level);
        Self {
            suspend_level: conf.suspend_level.clone().unwrap_or_else(|| level.clone()),
            level,
            repeat: conf.repeat().unwrap_or(driver_defaults.repeat),
            delay_up: conf.delay_up(),
            delay_down: conf.delay_down(),
        }
    }

    /// Defaults for a profile's band set: profile delays override the fan's.
    pub fn with_profile(&self, conf: &ProfileLevelsConfig) -> Self {
        Self {
            delay_up: conf.delay_up().or(self.delay_up),
            delay_down: conf.delay_down().or(self.delay_down),
            ..self.clone()
        }
    }
}

pub struct Fan {
    pub name: String,
    driver: Box<dyn FanDriver>,
    defaults: FanDefaults,
    select: Select,
    /// Empty means every sensor.
    sensors: Vec<String>,
    levels: Levels,
    profile_levels: HashMap<String, Levels>,
    /// Key into `profile_levels`, `None` for the base table.
    active: Option<String>,
    updated: Option<Instant>,
}

impl Fan {
    pub fn new(driver: Box<dyn FanDriver>, conf: &FanConfig) -> Self {
        let defaults = FanDefaults::new(driver.as_ref(), conf);
        let levels = Levels::new(&conf.levels, &defaults);
        let profile_levels = conf
            .profiles
            .iter()
            .map(|profile| {
                let table = Levels::new(&profile.levels, &defaults.with_profile(profile));
                (profile.name.clone(), table)
            })
            .collect();

        Self {
            name: conf.name.clone(),
            driver,
            defaults,
            select: conf.select,
            sensors: conf.sensors.clone(),
            levels,
            profile_levels,
            active: None,
            updated: None,
        }
    }

    pub fn driver(&self) -> &dyn FanDriver {
        self.driver.as_ref()
    }

    pub fn defaults(&self) -> &FanDefaults {
        &self.defaults
    }

    /// Level of the active table.
    pub fn level(&self) -> &str {
        self.active_levels().level()
    }

    /// Name of the active profile table, `None` when on the base table.
    pub fn active_profile(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Switch to the band set for `profile`, falling back to the base set.
    /// Each table keeps its own position and pending delay.
    pub fn update_profile(&mut self, profile: &str) {
        if self.profile_levels.is_empty() {
            return;
        }
        self.active = self
            .profile_levels
            .contains_key(profile)
            .then(|| profile.to_string());
    }

    /// Select the fan's input from `values`, step the active table and write
    /// the level if it changed or the repeat interval has passed.
    pub fn update_level(&mut self, values: &HashMap<String, f64>) -> Result<()> {
        self.update_level_at(values, Instant::now())
    }

    pub fn update_level_at(&mut self, values: &HashMap<String, f64>, now: Instant) -> Result<()> {
        let value = self.select_value(values);
        let changed = self.active_levels_mut().update_at(value, now);

        let fresh = self
            .updated
            .is_some_and(|at| now.saturating_duration_since(at) < self.defaults.repeat);
        if !changed && fresh {
            return Ok(());
        }

        let level = self.active_levels().level().to_string();
        log::info!("Fan {}: level {level} (value {value:.1})", self.name);
        self.driver
            .set_level(&level)
            .map_err(|source| Error::FanWrite {
                name: self.name.clone(),
                source,
            })?;
        self.updated = Some(now);
        Ok(())
    }

    /// Best effort: hand the fan back to its default level.
    pub fn set_default_level(&self) {
        log::info!("Fan {}: default level {}", self.name, self.defaults.level);
        if let Err(e) = self.driver.set_level(&self.defaults.level) {
            log::error!("Failed to set default level for {}: {e}", self.name);
        }
    }

    /// Best effort: set the level used while the system sleeps.
    pub fn set_suspend_level(&self) {
        log::info!(
            "Fan {}: suspend level {}",
            self.name,
            self.defaults.suspend_level
        );
        if let Err(e) = self.driver.set_level(&self.defaults.suspend_level) {
            log::error!("Failed to set suspend level for {}: {e}", self.name);
        }
    }

    fn select_value(&self, values: &HashMap<String, f64>) -> f64 {
        let selected: Vec<f64> = if self.sensors.is_empty() {
            values.values().copied().collect()
        } else {
            self.sensors
                .iter()
                .filter_map(|name| values.get(name).copied())
                .collect()
        };
        self.select.apply(&selected)
    }

    fn active_levels(&self) -> &Levels {
        self.active
            .as_ref()
            .and_then(|name| self.profile_levels.get(name))
            .unwrap_or(&self.levels)
    }

    fn active_levels_mut(&mut self) -> &mut Levels {
        match self
            .active
            .as_ref()
            .and_then(|name| self.profile_levels.get_mut(name))
        {
            Some(levels) => levels,
            None => &mut self.levels,
        }
    }
}
