mod args;

use std::fs;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use bmt_report::{
    cli::{load_annotations, process_paths_par},
    record::AnnotationSet,
    report::JsonReport,
    ParseOptions,
};

use args::Args;

fn main() -> Result<()> {
    let args = Args::from_cmd_line()?;

    let default_filter = if args.verbose {
        "bmt_report=debug"
    } else {
        "bmt_report=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let annotations = match &args.annotations {
        Some(path) => load_annotations(path)?,
        None => AnnotationSet::default(),
    };

    let options = ParseOptions {
        output_dir: Some(args.output.clone()),
        identity: None,
    };
    let mut batch = process_paths_par(&args.paths, &options);
    batch.annotate(&annotations);

    for failure in &batch.failures {
        eprintln!("failed: {}: {}", failure.path, failure.error);
    }
    if batch.records.is_empty() {
        bail!("none of the {} captures could be parsed", args.paths.len());
    }

    let renderer = JsonReport::new(args.output.join(&args.report));
    let report = batch.report_job(&args.title).run(&renderer)?;

    eprintln!(
        "Processed {} captures ({} failed)",
        batch.records.len(),
        batch.failures.len()
    );
    eprintln!("Report: {}", report.display());
    Ok(())
}
