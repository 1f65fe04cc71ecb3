// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Configuration file handling.
//!
//! Fans, sensors, threshold bands and the optional platform profile source
//! are read from TOML and normalised before the service is built.
//! Default path: `/etc/fanctl/config.toml`

use crate::error::{Error, Result};
use crate::select::Select;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fanctl/config.toml";

/// Default sampling period in seconds.
pub const DEFAULT_PERIOD_SECS: f64 = 1.0;

const PERIOD_RANGE: (f64, f64) = (0.01, 100.0);
const REPEAT_RANGE: (f64, f64) = (1.0, 3600.0);
const DELAY_RANGE: (f64, f64) = (0.0, 100.0);

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sampling period, in seconds.
    #[serde(default = "default_period")]
    pub period: f64,

    /// Whether suspend notifications (SIGUSR1) are handled.
    #[serde(default = "default_true")]
    pub suspend: bool,

    /// Source of the platform profile, required when any fan has profiles.
    #[serde(default)]
    pub profile: Option<ProfileConfig>,

    #[serde(default)]
    pub sensors: Vec<SensorConfig>,

    #[serde(default)]
    pub fans: Vec<FanConfig>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    #[default]
    Platform,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    #[default]
    Hwmon,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FanType {
    #[default]
    Thinkpad,
}

/// Where the current platform profile is read from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileConfig {
    #[serde(rename = "type", default)]
    pub kind: ProfileType,
    /// Override for `/sys/firmware/acpi/platform_profile`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// A named temperature source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SensorConfig {
    /// Name referenced by `fans.sensors`. Defaults to the sensor's index.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: SensorType,
    /// Substring of the hwmon device `name` (default `coretemp`)
    #[serde(default)]
    pub sensor: Option<String>,
    /// Substring of the `tempN_label` contents; all inputs when unset
    #[serde(default)]
    pub label: Option<String>,
    /// Multiplier applied to raw readings (default 0.001)
    #[serde(default)]
    pub factor: Option<f64>,
    /// Offset added after `factor`
    #[serde(default)]
    pub add: Option<f64>,
    /// How the matched inputs are reduced to one reading
    #[serde(default)]
    pub select: Select,
    /// Override for `/sys/class/hwmon`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// A controlled fan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FanConfig {
    /// Display name. Defaults to the fan's index.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: FanType,
    /// Override for `/proc/acpi/ibm/fan`
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Write labels verbatim instead of prefixing them with `level `
    #[serde(default)]
    pub raw_level: bool,

    /// Sensors feeding this fan; all sensors when empty
    #[serde(default)]
    pub sensors: Vec<String>,
    #[serde(default)]
    pub select: Select,

    /// Level used outside all bands and on shutdown
    #[serde(default)]
    pub level: Option<String>,
    /// Level written when the system suspends
    #[serde(default)]
    pub suspend_level: Option<String>,
    /// Maximum seconds between writes of an unchanged level
    #[serde(default)]
    pub repeat: Option<f64>,

    #[serde(default)]
    pub delay: Option<f64>,
    #[serde(default)]
    pub delay_up: Option<f64>,
    #[serde(default)]
    pub delay_down: Option<f64>,

    #[serde(default)]
    pub levels: Vec<LevelConfig>,
    #[serde(default)]
    pub profiles: Vec<ProfileLevelsConfig>,
}

/// Band set used while the platform reports the named profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileLevelsConfig {
    pub name: String,
    #[serde(default)]
    pub levels: Vec<LevelConfig>,
    #[serde(default)]
    pub delay: Option<f64>,
    #[serde(default)]
    pub delay_up: Option<f64>,
    #[serde(default)]
    pub delay_down: Option<f64>,
}

/// One threshold band.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LevelConfig {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    pub level: String,
    #[serde(default)]
    pub delay: Option<f64>,
    #[serde(default)]
    pub delay_up: Option<f64>,
    #[serde(default)]
    pub delay_down: Option<f64>,
}

impl Config {
    /// Sampling period. Out-of-range values give the default period.
    pub fn period(&self) -> Duration {
        let period = if in_range(self.period, PERIOD_RANGE) {
            self.period
        } else {
            DEFAULT_PERIOD_SECS
        };
        Duration::from_secs_f64(period)
    }
}

impl FanConfig {
    pub fn repeat(&self) -> Option<Duration> {
        seconds(self.repeat)
    }

    pub fn delay_up(&self) -> Option<Duration> {
        seconds(self.delay_up.or(self.delay))
    }

    pub fn delay_down(&self) -> Option<Duration> {
        seconds(self.delay_down.or(self.delay))
    }
}

impl ProfileLevelsConfig {
    pub fn delay_up(&self) -> Option<Duration> {
        seconds(self.delay_up.or(self.delay))
    }

    pub fn delay_down(&self) -> Option<Duration> {
        seconds(self.delay_down.or(self.delay))
    }
}

impl LevelConfig {
    pub fn delay_up(&self) -> Option<Duration> {
        seconds(self.delay_up.or(self.delay))
    }

    pub fn delay_down(&self) -> Option<Duration> {
        seconds(self.delay_down.or(self.delay))
    }
}

/// Convert a seconds value from the config file.
pub fn seconds(value: Option<f64>) -> Option<Duration> {
    value.and_then(|s| Duration::try_from_secs_f64(s).ok())
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load, parse and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse_config(&contents)?;
    validate(&mut config)?;

    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Parse TOML without validating it.
pub fn parse_config(contents: &str) -> Result<Config> {
    Ok(toml::from_str(contents)?)
}

/// Resolve the config file path from CLI arg or default.
pub fn resolve_config_path(cli_path: Option<&str>) -> PathBuf {
    cli_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check structural validity and normalise recoverable mistakes.
///
/// Out-of-range timings are dropped with a warning. Missing names are
/// replaced by the entry's index. Anything that would leave a fan without
/// a usable band set is an error.
pub fn validate(config: &mut Config) -> Result<()> {
    if !in_range(config.period, PERIOD_RANGE) {
        log::warn!(
            "period: must be within [{}, {}], using {DEFAULT_PERIOD_SECS}",
            PERIOD_RANGE.0,
            PERIOD_RANGE.1
        );
        config.period = DEFAULT_PERIOD_SECS;
    }

    validate_sensors(config)?;
    validate_fans(config)
}

fn validate_sensors(config: &mut Config) -> Result<()> {
    if config.sensors.is_empty() {
        return Err(invalid("sensors: is empty"));
    }

    let mut names = HashSet::new();
    for (idx, sensor) in config.sensors.iter_mut().enumerate() {
        if sensor.name.is_empty() {
            sensor.name = idx.to_string();
        }
        check_select(&format!("sensors[{idx}]"), &mut sensor.select);
        if !names.insert(sensor.name.clone()) {
            return Err(invalid(format!(
                "sensors[{idx}].name: multiple sensors with the same name"
            )));
        }
    }
    Ok(())
}

fn validate_fans(config: &mut Config) -> Result<()> {
    if config.fans.is_empty() {
        return Err(invalid("fans: is empty"));
    }

    let sensor_names: HashSet<&str> = config.sensors.iter().map(|s| s.name.as_str()).collect();
    let has_profile = config.profile.is_some();

    let mut names = HashSet::new();
    for (idx, fan) in config.fans.iter_mut().enumerate() {
        let prefix = format!("fans[{idx}]");

        if fan.name.is_empty() {
            fan.name = idx.to_string();
        }
        if !names.insert(fan.name.clone()) {
            log::warn!("{prefix}.name: multiple fans with the same name");
        }
        check_select(&prefix, &mut fan.select);

        if fan.repeat.is_some_and(|r| !in_range(r, REPEAT_RANGE)) {
            log::warn!(
                "{prefix}.repeat: must be within [{}, {}]",
                REPEAT_RANGE.0,
                REPEAT_RANGE.1
            );
            fan.repeat = None;
        }
        check_delays(
            &prefix,
            &mut fan.delay,
            &mut fan.delay_up,
            &mut fan.delay_down,
        );

        validate_levels(&mut fan.levels, &prefix)?;

        let mut level_count = fan.levels.len();
        for (profile_idx, profile) in fan.profiles.iter_mut().enumerate() {
            let profile_prefix = format!("{prefix}.profiles[{profile_idx}]");
            profile.name = profile.name.trim().to_string();
            if profile.name.is_empty() {
                return Err(invalid(format!("{profile_prefix}.name: must be set")));
            }
            check_delays(
                &profile_prefix,
                &mut profile.delay,
                &mut profile.delay_up,
                &mut profile.delay_down,
            );
            validate_levels(&mut profile.levels, &profile_prefix)?;
            level_count += profile.levels.len();
        }

        if level_count == 0 {
            return Err(invalid(format!("{prefix}: has no levels")));
        }
        if !fan.profiles.is_empty() && !has_profile {
            return Err(invalid(format!(
                "{prefix}.profiles: must set profile configuration"
            )));
        }

        let mut seen = HashSet::new();
        let before = fan.sensors.len();
        fan.sensors.retain(|s| seen.insert(s.clone()));
        if fan.sensors.len() != before {
            log::warn!("{prefix}.sensors: not unique");
        }
        if let Some(missing) = fan
            .sensors
            .iter()
            .find(|s| !sensor_names.contains(s.as_str()))
        {
            return Err(invalid(format!(
                "{prefix}.sensors: sensor '{missing}' not found"
            )));
        }
    }
    Ok(())
}

fn validate_levels(levels: &mut [LevelConfig], prefix: &str) -> Result<()> {
    for (idx, level) in levels.iter_mut().enumerate() {
        let level_prefix = format!("{prefix}.levels[{idx}]");

        if level.level.is_empty() {
            return Err(invalid(format!("{level_prefix}.level: must be set")));
        }
        match (level.min, level.max) {
            (None, None) => {
                return Err(invalid(format!("{level_prefix}: min or max must be set")));
            }
            (Some(min), Some(max)) if min >= max => {
                return Err(invalid(format!(
                    "{level_prefix}: min must be less than max"
                )));
            }
            _ => {}
        }
        check_delays(
            &level_prefix,
            &mut level.delay,
            &mut level.delay_up,
            &mut level.delay_down,
        );
    }
    Ok(())
}

fn check_select(prefix: &str, select: &mut Select) {
    if *select == Select::Unknown {
        log::warn!("{prefix}.select: must be one of min, max, average, using max");
        *select = Select::Max;
    }
}

fn check_delays(
    prefix: &str,
    delay: &mut Option<f64>,
    delay_up: &mut Option<f64>,
    delay_down: &mut Option<f64>,
) {
    for (key, value) in [
        ("delay", delay),
        ("delay_up", delay_up),
        ("delay_down", delay_down),
    ] {
        if value.is_some_and(|d| !in_range(d, DELAY_RANGE)) {
            log::warn!(
                "{prefix}.{key}: must be within [{}, {}]",
                DELAY_RANGE.0,
                DELAY_RANGE.1
            );
            *value = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn in_range(value: f64, (min, max): (f64, f64)) -> bool {
    value >= min && value <= max
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigInvalid(message.into())
}

fn default_period() -> f64 {
    DEFAULT_PERIOD_SECS
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
period = 0.5
suspend = false

[profile]
type = "platform"
path = "/sys/profile"

[[sensors]]
name = "cpu1"
type = "hwmon"
factor = 0.001
add = 0.5
select = "max"
sensor = "coretemp"
label = "Core"

[[fans]]
name = "cpu"
type = "thinkpad"
raw_level = true
level = "auto"
suspend_level = "0"
delay = 3
delay_up = 4
delay_down = 5
repeat = 30
select = "average"
path = "/some/path"
sensors = ["cpu1"]

[[fans.levels]]
min = 11
max = 56
level = "level 2"
delay = 6
delay_up = 7
delay_down = 8

[[fans.profiles]]
name = "perf"
delay = 19
delay_up = 18
delay_down = 17

[[fans.profiles.levels]]
min = 10
max = 55
level = "level 1"
delay = 5
"#;

    fn minimal() -> Config {
        parse_config(
            r#"
[[sensors]]
[[fans]]
[[fans.levels]]
max = 50
level = "1"
"#,
        )
        .unwrap()
    }

    fn invalid_message(config: &mut Config) -> String {
        match validate(config) {
            Err(Error::ConfigInvalid(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_full() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.period(), Duration::from_millis(500));
        assert!(!config.suspend);
        assert_eq!(
            config.profile,
            Some(ProfileConfig {
                kind: ProfileType::Platform,
                path: Some(PathBuf::from("/sys/profile")),
            })
        );

        let sensor = &config.sensors[0];
        assert_eq!(sensor.name, "cpu1");
        assert_eq!(sensor.add, Some(0.5));
        assert_eq!(sensor.label.as_deref(), Some("Core"));

        let fan = &config.fans[0];
        assert_eq!(fan.name, "cpu");
        assert!(fan.raw_level);
        assert_eq!(fan.select, Select::Average);
        assert_eq!(fan.suspend_level.as_deref(), Some("0"));
        assert_eq!(fan.repeat(), Some(Duration::from_secs(30)));
        assert_eq!(fan.delay_up(), Some(Duration::from_secs(4)));
        assert_eq!(fan.delay_down(), Some(Duration::from_secs(5)));
        assert_eq!(fan.levels[0].level, "level 2");
        assert_eq!(fan.levels[0].delay_up(), Some(Duration::from_secs(7)));
        assert_eq!(fan.profiles[0].name, "perf");
        assert_eq!(fan.profiles[0].delay_down(), Some(Duration::from_secs(17)));
        assert_eq!(
            fan.profiles[0].levels[0].delay_up(),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/fanctl.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = parse_config("[[fans]]\ntype = \"dell\"\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_unknown_select_falls_back_to_max() {
        let mut config = parse_config(
            r#"
[[sensors]]
select = "median"
[[fans]]
select = "mode"
[[fans.levels]]
max = 50
level = "1"
"#,
        )
        .unwrap();
        validate(&mut config).unwrap();
        assert_eq!(config.sensors[0].select, Select::Max);
        assert_eq!(config.fans[0].select, Select::Max);
    }

    #[test]
    fn test_period_outside_range_uses_default() {
        let mut config = minimal();
        config.period = 0.0;
        assert_eq!(config.period(), Duration::from_secs(1));
        config.period = -2.0;
        assert_eq!(config.period(), Duration::from_secs(1));
        config.period = f64::NAN;
        assert_eq!(config.period(), Duration::from_secs(1));
        config.period = 0.01;
        assert_eq!(config.period(), Duration::from_millis(10));
    }

    #[test]
    fn test_defaults_and_names() {
        let mut config = minimal();
        validate(&mut config).unwrap();
        assert_eq!(config.period(), Duration::from_secs(1));
        assert!(config.suspend);
        assert_eq!(config.sensors[0].name, "0");
        assert_eq!(config.fans[0].name, "0");
        assert_eq!(config.fans[0].select, Select::Max);
    }

    #[test]
    fn test_out_of_range_values_dropped() {
        let mut config = minimal();
        config.period = 1000.0;
        config.fans[0].repeat = Some(0.1);
        config.fans[0].delay = Some(-1.0);
        config.fans[0].levels[0].delay_up = Some(101.0);
        validate(&mut config).unwrap();
        assert_eq!(config.period, DEFAULT_PERIOD_SECS);
        assert_eq!(config.fans[0].repeat, None);
        assert_eq!(config.fans[0].delay, None);
        assert_eq!(config.fans[0].levels[0].delay_up, None);
    }

    #[test]
    fn test_empty_sections() {
        let mut config = minimal();
        config.sensors.clear();
        assert_eq!(invalid_message(&mut config), "sensors: is empty");

        let mut config = minimal();
        config.fans.clear();
        assert_eq!(invalid_message(&mut config), "fans: is empty");
    }

    #[test]
    fn test_duplicate_sensor_names() {
        let mut config = minimal();
        config.sensors = vec![
            SensorConfig {
                name: "cpu".to_string(),
                ..Default::default()
            },
            SensorConfig {
                name: "cpu".to_string(),
                ..Default::default()
            },
        ];
        assert_eq!(
            invalid_message(&mut config),
            "sensors[1].name: multiple sensors with the same name"
        );
    }

    #[test]
    fn test_level_checks() {
        let mut config = minimal();
        config.fans[0].levels[0].level.clear();
        assert_eq!(
            invalid_message(&mut config),
            "fans[0].levels[0].level: must be set"
        );

        let mut config = minimal();
        config.fans[0].levels[0].max = None;
        assert_eq!(
            invalid_message(&mut config),
            "fans[0].levels[0]: min or max must be set"
        );

        let mut config = minimal();
        config.fans[0].levels[0].min = Some(50.0);
        assert_eq!(
            invalid_message(&mut config),
            "fans[0].levels[0]: min must be less than max"
        );

        let mut config = minimal();
        config.fans[0].levels.clear();
        assert_eq!(invalid_message(&mut config), "fans[0]: has no levels");
    }

    #[test]
    fn test_profiles_need_profile_section() {
        let mut config = minimal();
        config.fans[0].profiles.push(ProfileLevelsConfig {
            name: " low ".to_string(),
            ..Default::default()
        });
        assert_eq!(
            invalid_message(&mut config),
            "fans[0].profiles: must set profile configuration"
        );

        config.profile = Some(ProfileConfig::default());
        validate(&mut config).unwrap();
        assert_eq!(config.fans[0].profiles[0].name, "low");

        config.fans[0].profiles[0].name = "  ".to_string();
        assert_eq!(
            invalid_message(&mut config),
            "fans[0].profiles[0].name: must be set"
        );
    }

    #[test]
    fn test_fan_sensors() {
        let mut config = minimal();
        config.sensors[0].name = "cpu".to_string();
        config.fans[0].sensors = vec!["cpu".to_string(), "cpu".to_string()];
        validate(&mut config).unwrap();
        assert_eq!(config.fans[0].sensors, vec!["cpu".to_string()]);

        config.fans[0].sensors.push("gpu".to_string());
        assert_eq!(
            invalid_message(&mut config),
            "fans[0].sensors: sensor 'gpu' not found"
        );
    }
}
