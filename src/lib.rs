//! Library to read thermal capture files (`.BMT`) from
//! handheld IR cameras and turn them into inspection report
//! records.
//!
//! A capture is a container of embedded JPEG streams, an
//! ASCII `<ToFo>` tag block declaring two segment sizes, an
//! XML item directory, and a raw data segment. Reading one
//! happens in three stages:
//!
//! 1. [Scan the container](container) for JPEG spans and the
//! tag block.
//!
//! 2. [Walk the directory](directory), addressing each item
//! in the data segment by the running sum of the declared
//! sizes before it, and decode the known fields.
//!
//! 3. [Derive metrics](metrics) from the raw sensor
//! readings: hot/cold spot positions and a 40 bin histogram.
//!
//! # Usage
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use std::path::Path;
//! use bmt_report::{parse_path, ParseOptions};
//!
//! let record = parse_path(Path::new("IR001373.BMT"), &ParseOptions {
//!     output_dir: Some("out".into()),
//!     identity: None,
//! })?;
//! println!("max {} °C", record.max_temp_display());
//! # Ok(())
//! # }
//! ```
//!
//! Records for a batch are handed to a
//! [`ReportRenderer`][report::ReportRenderer]; the crate
//! ships a JSON renderer.

#[macro_use]
pub mod error;
mod parse;

pub mod container;
pub mod directory;
pub mod image;
pub mod metrics;
pub mod record;
pub mod report;
pub mod temperature;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod fixtures;

pub use crate::error::{BmtError, ErrorKind};
pub use crate::image::{parse_bytes, parse_path, BmtImage, ParseOptions};
pub use crate::record::{Annotations, MeasurementRecord};
