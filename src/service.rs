// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! The control loop: sample sensors, follow the platform profile, drive fans.
//!
//! All state lives in [`Service`] and is only touched from [`Service::run`],
//! one event at a time. Driver I/O is synchronous and happens inline.

use crate::config::Config;
use crate::drivers::{self, ProfileDriver, SensorDriver};
use crate::error::{Error, Result};
use crate::fan::Fan;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use tokio::sync::mpsc;
use tokio::time::{self, Duration, MissedTickBehavior};

/// How long fans stay at their suspend level waiting for the system to sleep.
pub const SUSPEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Service {
    period: Duration,
    profile_driver: Option<Box<dyn ProfileDriver>>,
    sensor_drivers: BTreeMap<String, Box<dyn SensorDriver>>,
    fans: Vec<Fan>,
    profile: String,
    values: HashMap<String, f64>,
}

impl Service {
    /// Build the service and its drivers from a validated config.
    pub fn new(config: &Config) -> Self {
        Self {
            period: config.period(),
            profile_driver: drivers::create_profile(config.profile.as_ref()),
            sensor_drivers: drivers::create_sensors(&config.sensors),
            fans: config
                .fans
                .iter()
                .map(|conf| Fan::new(drivers::create_fan(conf), conf))
                .collect(),
            profile: String::new(),
            values: HashMap::with_capacity(config.sensors.len()),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn fans(&self) -> &[Fan] {
        &self.fans
    }

    /// Last sampled readings, keyed by sensor name.
    pub fn values(&self) -> &HashMap<String, f64> {
        &self.values
    }

    /// Last seen platform profile (empty before the first read).
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Initialise every driver once before the loop starts.
    pub fn init(&mut self) -> Result<()> {
        if let Some(profile) = &self.profile_driver {
            profile.init().map_err(Error::ProfileInit)?;
        }
        for (name, sensor) in self.sensor_drivers.iter_mut() {
            sensor.init().map_err(|source| Error::SensorInit {
                name: name.clone(),
                source,
            })?;
        }
        for fan in &self.fans {
            fan.driver().init().map_err(|source| Error::FanInit {
                name: fan.name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Run until `shutdown` resolves or a tick fails.
    ///
    /// Every message on `suspend` puts the fans into their suspend level and
    /// pauses the loop for at most [`SUSPEND_TIMEOUT`]. On shutdown all fans
    /// get their default level back.
    pub async fn run<F>(&mut self, shutdown: F, mut suspend: mpsc::Receiver<()>) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    log::info!("Shutting down");
                    self.set_default_level();
                    return Ok(());
                }
                Some(()) = suspend.recv() => {
                    log::info!("Got suspend signal");
                    self.set_suspend_level();
                    tokio::select! {
                        _ = &mut shutdown => {
                            log::info!("Shutting down");
                            self.set_default_level();
                            return Ok(());
                        }
                        _ = time::sleep(SUSPEND_TIMEOUT) => {}
                    }
                    interval.reset();
                }
                _ = interval.tick() => {
                    self.update()?;
                }
            }
        }
    }

    /// One tick: read sensors, follow the profile, update every fan.
    pub fn update(&mut self) -> Result<()> {
        self.update_values()?;
        self.update_profile()?;

        if log::log_enabled!(log::Level::Debug) {
            let mut readings: Vec<_> = self.values.iter().collect();
            readings.sort_by(|a, b| a.0.cmp(b.0));
            log::debug!("State: profile={:?} sensors={readings:?}", self.profile);
        }

        for fan in &mut self.fans {
            fan.update_level(&self.values)?;
        }
        Ok(())
    }

    pub fn set_default_level(&self) {
        for fan in &self.fans {
            fan.set_default_level();
        }
    }

    pub fn set_suspend_level(&self) {
        for fan in &self.fans {
            fan.set_suspend_level();
        }
    }

    fn update_values(&mut self) -> Result<()> {
        for (name, sensor) in &self.sensor_drivers {
            let value = sensor.value().map_err(|source| Error::SensorRead {
                name: name.clone(),
                source,
            })?;
            self.values.insert(name.clone(), value);
        }
        Ok(())
    }

    fn update_profile(&mut self) -> Result<()> {
        let Some(driver) = &self.profile_driver else {
            return Ok(());
        };
        let profile = driver.state().map_err(Error::ProfileRead)?;
        if profile != self.profile {
            log::info!("Profile changed to {profile}");
            for fan in &mut self.fans {
                fan.update_profile(&profile);
            }
            self.profile = profile;
        }
        Ok(())
    }
}

/// Relays suspend notifications from the system sleep hook to [`Service::run`].
///
/// When suspend handling is disabled the notification is logged and dropped,
/// so the signal is still consumed instead of terminating the process.
pub struct SuspendForwarder {
    enabled: bool,
    tx: mpsc::Sender<()>,
}

impl SuspendForwarder {
    pub fn new(enabled: bool, tx: mpsc::Sender<()>) -> Self {
        Self { enabled, tx }
    }

    /// Handle one notification. Returns `false` once the service is gone.
    pub async fn notify(&self) -> bool {
        if !self.enabled {
            log::debug!("Suspend handling disabled, ignoring suspend signal");
            return true;
        }
        self.tx.send(()).await.is_ok()
    }
}
