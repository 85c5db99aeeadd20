//! Temperature units and severity classification.
//!
//! Capture files store temperatures as 32-bit floats in
//! Kelvin; everything past the parser works in °C.
use std::fmt;

use serde_derive::*;

pub const CELSIUS_OFFSET: f64 = 273.15;

/// Above this (°C) a reading is [`Severity::Critical`].
pub const CRITICAL_ABOVE: f64 = 70.;
/// At or above this (°C) a reading is at least
/// [`Severity::Warning`].
pub const WARNING_FROM: f64 = 50.;

pub fn kelvin_to_celsius(kelvin: f32) -> f64 {
    kelvin as f64 - CELSIUS_OFFSET
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub fn classify(celsius: f64) -> Self {
        if celsius > CRITICAL_ABOVE {
            Severity::Critical
        } else if celsius >= WARNING_FROM {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }

    /// Classify a temperature that may be missing.
    pub fn of(celsius: Option<f64>) -> Option<Self> {
        celsius.map(Self::classify)
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Normal
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Normal => "Normal",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
        })
    }
}
