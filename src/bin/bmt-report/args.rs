use anyhow::Result;
use bmt_report::{arg, args_parser, opt};
use std::path::PathBuf;

pub const DEFAULT_TITLE: &str = "Thermal Inspection Report";

pub struct Args {
    pub paths: Vec<String>,
    pub output: PathBuf,
    pub title: String,
    pub annotations: Option<PathBuf>,
    pub report: String,
    pub verbose: bool,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("bmt-report")
            .about("Build an inspection report from thermal capture (.BMT) files.")
            .arg(
                opt!("output")
                    .short("o")
                    .help("Directory for extracted images and the report (default: .)"),
            )
            .arg(opt!("title").short("t").help("Report title"))
            .arg(
                opt!("annotations")
                    .short("a")
                    .help("JSON file with remarks / conclusion / recommendation per file"),
            )
            .arg(opt!("report").help("Report file name (default: report.json)"))
            .arg(
                opt!("verbose")
                    .short("v")
                    .takes_value(false)
                    .help("Log parsing details"),
            )
            .arg(
                arg!("paths")
                    .required(true)
                    .multiple(true)
                    .help("Capture paths"),
            )
            .get_matches();

        let paths: Vec<String> = matches
            .values_of("paths")
            .map(|v| v.map(|f| f.into()).collect())
            .unwrap_or_default();
        let output: PathBuf = matches.value_of("output").unwrap_or(".").into();
        let title: String = matches.value_of("title").unwrap_or(DEFAULT_TITLE).into();
        let annotations = matches.value_of("annotations").map(PathBuf::from);
        let report: String = matches.value_of("report").unwrap_or("report.json").into();
        let verbose = matches.is_present("verbose");

        Ok(Args {
            paths,
            output,
            title,
            annotations,
            report,
            verbose,
        })
    }
}
