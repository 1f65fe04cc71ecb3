// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Error type shared by the config loader, the fan controllers and the service.

use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------
    #[error("read config {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("{0}")]
    ConfigInvalid(String),

    // -----------------------------------------------------------------------
    // Driver initialisation
    // -----------------------------------------------------------------------
    #[error("profile init: {0}")]
    ProfileInit(#[source] io::Error),

    #[error("sensor ({name}) init: {source}")]
    SensorInit { name: String, source: io::Error },

    #[error("fan ({name}) init: {source}")]
    FanInit { name: String, source: io::Error },

    // -----------------------------------------------------------------------
    // Tick I/O
    // -----------------------------------------------------------------------
    #[error("get sensor ({name}) value: {source}")]
    SensorRead { name: String, source: io::Error },

    #[error("get profile: {0}")]
    ProfileRead(#[source] io::Error),

    #[error("set fan ({name}) level: {source}")]
    FanWrite { name: String, source: io::Error },
}
