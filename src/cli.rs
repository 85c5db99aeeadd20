//! Helpers for the accompanying binary: argument macros and
//! the parallel batch driver.
//!
//! APIs here shouldn't be considered stable / used as a
//! library.

use std::{collections::HashSet, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
pub use clap::{App, Arg};
use indicatif::{ProgressBar, ProgressStyle};
pub use inflector::Inflector;
use itertools::{Either, Itertools};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use tracing::{info, warn};

use crate::{
    error::BmtError,
    image::{identity_of, parse_path, ParseOptions},
    record::{AnnotationSet, MeasurementRecord},
    report::{FailedCapture, ReportJob},
};

#[macro_export]
macro_rules! args_parser {
    ($name:expr) => {{
        $crate::cli::App::new($name)
            .version(clap::crate_version!())
            .author(clap::crate_authors!())
    }};
}

#[macro_export]
macro_rules! arg {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name).value_name(&$name.to_screaming_snake_case())
    }};
}

#[macro_export]
macro_rules! opt {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name)
            .long(&$name.to_kebab_case())
            .value_name(&$name.to_screaming_snake_case())
    }};
}

/// A capture that could not be parsed.
#[derive(Debug)]
pub struct Failure {
    pub path: String,
    pub error: BmtError,
}

/// Outcome of a batch: records in input order, and the
/// files that failed.
#[derive(Debug, Default)]
pub struct Batch {
    pub records: Vec<MeasurementRecord>,
    pub failures: Vec<Failure>,
    /// Input index of each record.
    positions: Vec<usize>,
}

impl Batch {
    /// Attach annotations by identity or by position in the
    /// original input list.
    pub fn annotate(&mut self, annotations: &AnnotationSet) {
        for (rec, &index) in self.records.iter_mut().zip(&self.positions) {
            rec.annotate(annotations.lookup(index, &rec.identity));
        }
    }

    /// Position of each record in the input list.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn report_job<'a>(&'a self, title: &'a str) -> ReportJob<'a> {
        ReportJob {
            title,
            records: &self.records,
            failed: self
                .failures
                .iter()
                .map(|f| FailedCapture {
                    path: f.path.clone(),
                    cause: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Output names for a batch, one per path. Paths that share
/// a stem get `_2`, `_3`, ... appended to it in input order,
/// so no two captures write the same image files. The
/// extension is kept and dropped again by [`identity_of`].
fn unique_names(paths: &[String], identity: Option<&str>) -> Vec<String> {
    let mut taken = HashSet::new();
    paths
        .iter()
        .map(|p| {
            let base = identity.unwrap_or(p);
            let stem = identity_of(base);
            let mut id = stem.clone();
            let mut n = 1;
            while !taken.insert(id.clone()) {
                n += 1;
                id = format!("{}_{}", stem, n);
            }
            if n > 1 {
                warn!("{} shares the name {}, writing it as {}", p, stem, id);
            }
            match Path::new(base).extension() {
                Some(ext) => format!("{}.{}", id, ext.to_string_lossy()),
                None => id,
            }
        })
        .collect()
}

/// Parse every path in parallel. Each file is independent:
/// a failure is logged and recorded, and the rest go on.
pub fn process_paths_par(paths: &[String], options: &ParseOptions) -> Batch {
    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {wide_bar:cyan/blue} {pos:>7}/{len:7}"),
    );

    let names = unique_names(paths, options.identity.as_deref());
    let results: Vec<_> = names
        .into_par_iter()
        .enumerate()
        .map(|(index, name)| {
            let options = ParseOptions {
                identity: Some(name),
                ..options.clone()
            };
            let res = parse_path(Path::new(&paths[index]), &options);
            bar.inc(1);
            (index, res)
        })
        .collect();
    bar.finish_and_clear();

    let (parsed, failures): (Vec<_>, Vec<_>) =
        results.into_iter().partition_map(|(index, res)| match res {
            Ok(rec) => Either::Left((index, rec)),
            Err(error) => {
                let path = paths[index].clone();
                warn!("skipping {}: {}", path, error);
                Either::Right(Failure { path, error })
            }
        });
    let (positions, records): (Vec<_>, Vec<_>) = parsed.into_iter().unzip();

    info!(
        "parsed {} of {} captures: {}",
        records.len(),
        paths.len(),
        records.iter().map(|r| r.identity.as_str()).join(", ")
    );
    Batch {
        records,
        failures,
        positions,
    }
}

/// Read an annotations file (see [`AnnotationSet`]).
pub fn load_annotations(path: &Path) -> Result<AnnotationSet> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing annotations {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, fixtures::BmtBuilder};
    use std::fs;

    #[test]
    fn batch_keeps_going_past_failures() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut paths = vec![];
        for (name, bytes) in [
            ("IR1.BMT", BmtBuilder::new().f32("TempMax", 300.).build()),
            ("IR2.BMT", b"no tag block here".to_vec()),
            ("IR3.BMT", BmtBuilder::new().f32("TempMax", 350.).build()),
        ]
        .iter()
        {
            let p = dir.path().join(name);
            fs::write(&p, bytes)?;
            paths.push(p.to_string_lossy().into_owned());
        }
        paths.push(dir.path().join("missing.BMT").to_string_lossy().into_owned());

        let batch = process_paths_par(&paths, &ParseOptions::default());
        let ids: Vec<_> = batch.records.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(ids, ["IR1", "IR3"]);

        let kinds: Vec<_> = batch.failures.iter().map(|f| f.error.kind()).collect();
        assert_eq!(kinds, [ErrorKind::Format, ErrorKind::Io]);
        Ok(())
    }

    #[test]
    fn annotations_follow_input_position() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let paths: Vec<String> = ["A.BMT", "B.BMT"]
            .iter()
            .map(|n| -> Result<String> {
                let p = dir.path().join(n);
                fs::write(&p, BmtBuilder::new().f32("TempMax", 300.).build())?;
                Ok(p.to_string_lossy().into_owned())
            })
            .collect::<Result<_>>()?;

        let notes = dir.path().join("notes.json");
        fs::write(&notes, r#"[{"remarks": "first"}, {"remarks": "second"}]"#)?;

        let mut batch = process_paths_par(&paths, &ParseOptions::default());
        batch.annotate(&load_annotations(&notes)?);
        assert_eq!(batch.records[0].annotations.remarks, "first");
        assert_eq!(batch.records[1].annotations.remarks, "second");
        Ok(())
    }

    #[test]
    fn same_stem_captures_stay_apart() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("out");
        fs::create_dir(&out)?;

        let mut paths = vec![];
        for (sub, size) in [("a", 300), ("b", 700)].iter() {
            fs::create_dir(dir.path().join(sub))?;
            let p = dir.path().join(sub).join("IR1.BMT");
            fs::write(&p, BmtBuilder::new().image(*size).f32("TempMax", 300.).build())?;
            paths.push(p.to_string_lossy().into_owned());
        }

        let notes = dir.path().join("notes.json");
        fs::write(&notes, r#"[{"remarks": "first"}, {"remarks": "second"}]"#)?;

        let options = ParseOptions {
            output_dir: Some(out.clone()),
            identity: None,
        };
        let mut batch = process_paths_par(&paths, &options);
        batch.annotate(&load_annotations(&notes)?);

        let ids: Vec<_> = batch.records.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(ids, ["IR1", "IR1_2"]);
        assert_eq!(batch.positions(), &[0, 1]);
        assert_eq!(batch.records[0].annotations.remarks, "first");
        assert_eq!(batch.records[1].annotations.remarks, "second");

        assert_eq!(fs::read(out.join("IR1.jpg"))?.len(), 300);
        assert_eq!(fs::read(out.join("IR1_2.jpg"))?.len(), 700);
        assert_eq!(fs::read_dir(&out)?.count(), 2);
        Ok(())
    }

    #[test]
    fn positions_skip_failed_inputs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut paths = vec![];
        for (name, bytes) in [
            ("A.BMT", b"broken".to_vec()),
            ("B.BMT", BmtBuilder::new().f32("TempMax", 300.).build()),
        ]
        .iter()
        {
            let p = dir.path().join(name);
            fs::write(&p, bytes)?;
            paths.push(p.to_string_lossy().into_owned());
        }

        let notes: AnnotationSet =
            serde_json::from_str(r#"[{"remarks": "for A"}, {"remarks": "for B"}]"#)?;
        let mut batch = process_paths_par(&paths, &ParseOptions::default());
        batch.annotate(&notes);

        assert_eq!(batch.positions(), &[1]);
        assert_eq!(batch.records[0].annotations.remarks, "for B");

        let job = batch.report_job("t");
        assert_eq!(job.failed.len(), 1);
        assert!(job.failed[0].path.ends_with("A.BMT"));
        assert!(job.failed[0].cause.contains("missing tag block"));
        Ok(())
    }

    #[test]
    fn unique_names_keep_extension() {
        let paths: Vec<String> = ["x/IR1.BMT", "y/IR1.BMT", "IR1_2.BMT", "plain", "z/plain"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let names = unique_names(&paths, None);
        assert_eq!(
            names,
            ["IR1.BMT", "IR1_2.BMT", "IR1_2_2.BMT", "plain", "plain_2"]
        );
        let ids: Vec<_> = names.iter().map(|n| identity_of(n)).collect();
        assert_eq!(ids, ["IR1", "IR1_2", "IR1_2_2", "plain", "plain_2"]);
    }
}
