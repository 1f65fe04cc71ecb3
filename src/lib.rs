// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! fanctl: a fan level daemon.
//!
//! Temperature sensors are sampled periodically, the readings are reduced to
//! one value per fan, and that value is mapped onto a discrete fan level
//! through threshold bands with per-direction delays. Bands can be swapped
//! per platform profile (e.g. `low-power`, `performance`).

pub mod config;
pub mod drivers;
pub mod error;
pub mod fan;
pub mod levels;
pub mod select;
pub mod service;

pub use error::{Error, Result};
