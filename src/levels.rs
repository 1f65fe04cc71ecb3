// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Threshold bands and the hysteresis walker that picks the active one.
//!
//! A table maps a sensor value to a discrete fan level. Each band covers
//! `[min, max]` where a missing bound is open-ended. Neighbouring bands may
//! overlap, which gives hysteresis: the active band is only left once the
//! value leaves *its* range. Transitions can additionally be delayed per
//! direction, so a value has to stay past the boundary for a while before
//! the level actually changes.

use crate::config::LevelConfig;
use crate::fan::FanDefaults;
use std::cmp::Ordering;
use std::time::{Duration, Instant};

/// A single threshold band.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    /// Lower bound, `None` is -inf
    pub min: Option<f64>,
    /// Upper bound, `None` is +inf
    pub max: Option<f64>,
    /// Level written to the fan while this band is active
    pub level: String,
    pub delay_up: Duration,
    pub delay_down: Duration,
}

impl Band {
    fn fallback(defaults: &FanDefaults) -> Self {
        Self {
            min: None,
            max: None,
            level: defaults.level.clone(),
            delay_up: defaults.delay_up.unwrap_or_default(),
            delay_down: defaults.delay_down.unwrap_or_default(),
        }
    }

    fn from_config(conf: &LevelConfig, defaults: &FanDefaults) -> Self {
        Self {
            min: conf.min,
            max: conf.max,
            level: conf.level.clone(),
            delay_up: conf
                .delay_up()
                .or(defaults.delay_up)
                .unwrap_or_default(),
            delay_down: conf
                .delay_down()
                .or(defaults.delay_down)
                .unwrap_or_default(),
        }
    }
}

/// Direction of a pending transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Debounce state of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    Idle,
    Pending {
        direction: Direction,
        started_at: Instant,
    },
}

/// Ordered bands plus the walker state.
#[derive(Debug, Clone)]
pub struct Levels {
    bands: Vec<Band>,
    current: usize,
    delay: Delay,
    seeded: bool,
}

impl Levels {
    /// Build a table from configured bands.
    ///
    /// Bands are sorted by `(min, max)`. Edge bands carrying the default
    /// level are added so that the whole real line is covered; an empty
    /// list yields a single catch-all band.
    pub fn new(confs: &[LevelConfig], defaults: &FanDefaults) -> Self {
        let mut bands: Vec<Band> = confs
            .iter()
            .map(|c| Band::from_config(c, defaults))
            .collect();
        bands.sort_by(cmp_bands);

        if bands.is_empty() {
            bands.push(Band::fallback(defaults));
        }

        if let Some(min) = bands[0].min {
            let mut below = Band::fallback(defaults);
            below.max = Some(min);
            bands.insert(0, below);
        }

        if let Some(max) = bands[bands.len() - 1].max {
            let mut above = Band::fallback(defaults);
            above.min = Some(max);
            bands.push(above);
        }

        Self {
            bands,
            current: 0,
            delay: Delay::Idle,
            seeded: false,
        }
    }

    /// Feed a new value. Returns `true` when the active band changed.
    pub fn update(&mut self, value: f64) -> bool {
        self.update_at(value, Instant::now())
    }

    /// Same as [`Levels::update`] with an explicit clock.
    pub fn update_at(&mut self, value: f64, now: Instant) -> bool {
        let next = self.find(value);

        if !self.seeded {
            self.seeded = true;
            self.current = next;
            self.delay = Delay::Idle;
            return true;
        }

        if next == self.current {
            self.delay = Delay::Idle;
            return false;
        }

        let band = &self.bands[self.current];
        let (direction, delay) = if next > self.current {
            (Direction::Up, band.delay_up)
        } else {
            (Direction::Down, band.delay_down)
        };

        if !delay.is_zero() {
            match self.delay {
                Delay::Pending {
                    direction: pending,
                    started_at,
                } if pending == direction => {
                    if now.saturating_duration_since(started_at) < delay {
                        return false;
                    }
                }
                _ => {
                    self.delay = Delay::Pending {
                        direction,
                        started_at: now,
                    };
                    return false;
                }
            }
        }

        self.delay = Delay::Idle;
        self.current = next;
        true
    }

    /// Label of the active band.
    pub fn level(&self) -> &str {
        &self.bands[self.current].level
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn delay(&self) -> Delay {
        self.delay
    }

    /// Local search starting at the active band. Sensor values move
    /// gradually, so this rarely steps more than one band.
    fn find(&self, value: f64) -> usize {
        let mut next = self.current;
        while next > 0 && self.bands[next].min.is_some_and(|min| value < min) {
            next -= 1;
        }
        while next + 1 < self.bands.len() && self.bands[next].max.is_some_and(|max| value > max) {
            next += 1;
        }
        next
    }
}

/// Order by `min` (missing = -inf), then by `max` (missing = +inf).
fn cmp_bands(a: &Band, b: &Band) -> Ordering {
    let by_min = match (a.min, b.min) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_min.then_with(|| match (a.max, b.max) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}
