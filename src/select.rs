// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Reduction of several sensor readings to a single value.

use serde::{Deserialize, Serialize};

/// How a set of readings is reduced to one value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Select {
    Min,
    #[default]
    Max,
    Average,
    /// Any name not listed above. Reduces like [`Select::Max`].
    #[serde(other)]
    Unknown,
}

impl Select {
    /// Reduce `values` to one number. An empty slice yields `0.0`.
    pub fn apply(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            Select::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Select::Max | Select::Unknown => {
                values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            }
            Select::Average => values.iter().sum::<f64>() / values.len() as f64,
        }
    }
}
