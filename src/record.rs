//! The measurement record built for each capture.
use std::{collections::HashMap, path::PathBuf};

use chrono::{DateTime, Utc};
use serde_derive::*;

use crate::{metrics::Spots, temperature::Severity};

/// Shown in place of any value the capture did not carry.
pub const NOT_AVAILABLE: &str = "N/A";

/// Free text attached by whoever prepares the report.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Annotations {
    pub remarks: String,
    pub conclusion: String,
    pub recommendation: String,
}

/// Annotations for a batch: either a list matched to files
/// by position, or a map keyed by identity.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AnnotationSet {
    ByIndex(Vec<Annotations>),
    ByIdentity(HashMap<String, Annotations>),
}

impl Default for AnnotationSet {
    fn default() -> Self {
        AnnotationSet::ByIndex(vec![])
    }
}

impl AnnotationSet {
    pub fn lookup(&self, index: usize, identity: &str) -> Annotations {
        let found = match self {
            AnnotationSet::ByIndex(list) => list.get(index),
            AnnotationSet::ByIdentity(map) => map.get(identity),
        };
        found.cloned().unwrap_or_default()
    }
}

/// One parsed capture.
///
/// Temperatures are °C. Anything the capture did not carry
/// is `None`, never a placeholder number.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub identity: String,
    pub captured_at: Option<DateTime<Utc>>,

    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub center_temp: Option<f64>,
    pub reflected_temp: Option<f64>,
    pub emissivity: Option<f64>,

    pub thermal_image: Option<PathBuf>,
    pub real_image: Option<PathBuf>,

    pub spots: Option<Spots>,
    pub histogram: Vec<f64>,
    pub severity: Severity,

    #[serde(flatten)]
    pub annotations: Annotations,
}

fn one_decimal(v: Option<f64>) -> String {
    v.map_or_else(|| NOT_AVAILABLE.into(), |v| format!("{:.1}", v))
}

impl MeasurementRecord {
    pub fn max_temp_display(&self) -> String {
        one_decimal(self.max_temp)
    }

    pub fn min_temp_display(&self) -> String {
        one_decimal(self.min_temp)
    }

    pub fn center_temp_display(&self) -> String {
        one_decimal(self.center_temp)
    }

    pub fn reflected_temp_display(&self) -> String {
        one_decimal(self.reflected_temp)
    }

    pub fn emissivity_display(&self) -> String {
        self.emissivity
            .map_or_else(|| NOT_AVAILABLE.into(), |e| format!("{:.2}", e))
    }

    /// Capture date as `YYYY-MM-DD`.
    pub fn date_display(&self) -> String {
        self.captured_at
            .map_or_else(|| NOT_AVAILABLE.into(), |d| d.format("%Y-%m-%d").to_string())
    }

    /// Severity of the min, center and max columns of the
    /// report table, in that order.
    pub fn column_severities(&self) -> [Option<Severity>; 3] {
        [
            Severity::of(self.min_temp),
            Severity::of(self.center_temp),
            Severity::of(self.max_temp),
        ]
    }

    pub fn annotate(&mut self, annotations: Annotations) {
        self.annotations = annotations;
    }
}
