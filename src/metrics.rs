//! Values derived from the raw sensor readings: hot/cold
//! spot positions and the reading histogram.
use serde_derive::*;

use crate::directory::RawStats;

/// Width / height assumed for the sensor grid.
pub const ASPECT_RATIO: f64 = 4. / 3.;

pub const HISTOGRAM_BINS: usize = 40;

/// Sensor grid dimensions reconstructed from a pixel count.
///
/// The capture does not store them next to the readings, so
/// they are guessed from [`ASPECT_RATIO`]: 43200 readings
/// give a 240x180 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorGrid {
    pub width: usize,
    pub height: usize,
}

impl SensorGrid {
    pub fn from_pixel_count(count: usize) -> Option<Self> {
        let width = (count as f64 * ASPECT_RATIO).sqrt().round() as usize;
        let height = (width as f64 / ASPECT_RATIO).round() as usize;
        if width == 0 || height == 0 {
            return None;
        }
        Some(SensorGrid { width, height })
    }

    /// Position of a linear reading index, as percentages
    /// of the grid width and height.
    pub fn spot(&self, index: usize) -> Spot {
        let col = index % self.width;
        let row = index / self.width;
        Spot {
            x: col as f64 / self.width as f64 * 100.,
            y: row as f64 / self.height as f64 * 100.,
        }
    }
}

/// Normalized image coordinates, 0 to 100.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Spot {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Spots {
    pub hot: Spot,
    pub cold: Spot,
}

impl Spots {
    pub fn locate(raw: &RawStats) -> Option<Self> {
        let grid = SensorGrid::from_pixel_count(raw.pixel_count())?;
        Some(Spots {
            hot: grid.spot(raw.max_index),
            cold: grid.spot(raw.min_index),
        })
    }
}

/// Share of readings (percent) in each of
/// [`HISTOGRAM_BINS`] equal-width bins over `[raw.min, raw.max]`.
///
/// Bins are in raw sensor units. The histogram is only
/// computed when the calibrated range is known too; it is
/// empty if either end is missing or the raw range is zero.
pub fn histogram(raw: &RawStats, temp_min: Option<f64>, temp_max: Option<f64>) -> Vec<f64> {
    if temp_min.is_none() || temp_max.is_none() || raw.readings.is_empty() {
        return vec![];
    }
    let range = raw.max as f64 - raw.min as f64;
    if range <= 0. {
        return vec![];
    }

    let bin_width = range / HISTOGRAM_BINS as f64;
    let mut bins = vec![0usize; HISTOGRAM_BINS];
    for &v in &raw.readings {
        let idx = ((v as f64 - raw.min as f64) / bin_width).floor();
        let idx = idx.max(0.).min((HISTOGRAM_BINS - 1) as f64) as usize;
        bins[idx] += 1;
    }

    let total = raw.readings.len() as f64;
    bins.into_iter()
        .map(|count| count as f64 / total * 100.)
        .collect()
}
