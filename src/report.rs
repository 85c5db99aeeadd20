//! Seams between the parser and the rest of a report job.
//!
//! [`BmtSource`] turns capture bytes into records and
//! [`ReportRenderer`] turns records into a document. The
//! bundled renderer writes JSON; page layout (PDF, HTML) is
//! left to other implementations of the trait.
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_derive::*;

use crate::{
    error,
    image::{identity_of, parse_bytes},
    record::MeasurementRecord,
    temperature::Severity,
};

pub trait BmtSource {
    fn parse(&self, bytes: &[u8], identity: &str) -> error::Result<MeasurementRecord>;
}

/// The built-in [`BmtSource`]: extracts images into
/// `output_dir` when set.
#[derive(Debug, Default, Clone)]
pub struct BmtParser {
    pub output_dir: Option<PathBuf>,
}

impl BmtSource for BmtParser {
    fn parse(&self, bytes: &[u8], identity: &str) -> error::Result<MeasurementRecord> {
        parse_bytes(bytes, &identity_of(identity), self.output_dir.as_deref())
    }
}

pub trait ReportRenderer {
    /// Render `records` in order under `title`. Returns the
    /// path of the produced document.
    fn render(&self, records: &[MeasurementRecord], title: &str) -> Result<PathBuf> {
        self.render_job(&ReportJob::new(title, records))
    }

    fn render_job(&self, job: &ReportJob) -> Result<PathBuf>;
}

/// A capture left out of the report.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FailedCapture {
    pub path: String,
    pub cause: String,
}

/// Everything one report is made of.
#[derive(Debug, Clone)]
pub struct ReportJob<'a> {
    pub title: &'a str,
    pub records: &'a [MeasurementRecord],
    pub failed: Vec<FailedCapture>,
}

impl<'a> ReportJob<'a> {
    pub fn new(title: &'a str, records: &'a [MeasurementRecord]) -> Self {
        ReportJob {
            title,
            records,
            failed: vec![],
        }
    }

    pub fn run<R: ReportRenderer + ?Sized>(&self, renderer: &R) -> Result<PathBuf> {
        renderer.render_job(self)
    }
}

/// One row of the report table, as displayed.
#[derive(Serialize, Debug, PartialEq)]
pub struct TableRow {
    pub date: String,
    pub max_temp: String,
    pub min_temp: String,
    pub center_temp: String,
    pub reflected_temp: String,
    pub emissivity: String,
    pub min_severity: Option<Severity>,
    pub center_severity: Option<Severity>,
    pub max_severity: Option<Severity>,
}

impl From<&MeasurementRecord> for TableRow {
    fn from(r: &MeasurementRecord) -> Self {
        let [min_severity, center_severity, max_severity] = r.column_severities();
        TableRow {
            date: r.date_display(),
            max_temp: r.max_temp_display(),
            min_temp: r.min_temp_display(),
            center_temp: r.center_temp_display(),
            reflected_temp: r.reflected_temp_display(),
            emissivity: r.emissivity_display(),
            min_severity,
            center_severity,
            max_severity,
        }
    }
}

#[derive(Serialize, Debug)]
struct Page<'a> {
    page: usize,
    #[serde(flatten)]
    record: &'a MeasurementRecord,
    table: TableRow,
}

#[derive(Serialize, Debug)]
struct Document<'a> {
    title: &'a str,
    generated_at: DateTime<Utc>,
    records: Vec<Page<'a>>,
    failed: usize,
    failures: &'a [FailedCapture],
}

/// Writes the report as a single JSON document, one page
/// per record, followed by the failure count and causes.
#[derive(Debug, Clone)]
pub struct JsonReport {
    pub path: PathBuf,
}

impl JsonReport {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonReport {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ReportRenderer for JsonReport {
    fn render_job(&self, job: &ReportJob) -> Result<PathBuf> {
        let doc = Document {
            title: job.title,
            generated_at: Utc::now(),
            records: job
                .records
                .iter()
                .enumerate()
                .map(|(i, record)| Page {
                    page: i + 1,
                    record,
                    table: record.into(),
                })
                .collect(),
            failed: job.failed.len(),
            failures: &job.failed,
        };

        let file = File::create(&self.path)
            .with_context(|| format!("creating report {}", self.path.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &doc)?;
        out.flush()?;
        Ok(self.path.clone())
    }
}
