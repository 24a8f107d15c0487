use std::fs;
use std::path::Path;

use pdfgrid::{BBox, DocumentStatus, ExtractOptions, Extractor, PdfError};
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::OptionArgs;

/// Install the stderr log subscriber. Warnings only unless `-v` is given.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: logging disabled: {e}");
    }
}

/// Print `err` and map it to the failure exit code.
pub fn report(err: impl std::fmt::Display) -> i32 {
    eprintln!("Error: {err}");
    1
}

/// Read the whole input file.
pub fn read_pdf(file: &Path) -> Result<Vec<u8>, i32> {
    if !file.exists() {
        eprintln!("Error: file not found: {}", file.display());
        return Err(1);
    }
    fs::read(file).map_err(|e| report(format!("cannot read {}: {e}", file.display())))
}

/// Options from `--config`, if any, with the flags applied on top.
pub fn load_options(args: &OptionArgs) -> Result<ExtractOptions, i32> {
    let base = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| report(format!("cannot read config {}: {e}", path.display())))?;
            parse_config(&text)
                .map_err(|e| report(format!("invalid config {}: {e}", path.display())))?
        }
        None => ExtractOptions::default(),
    };
    Ok(apply_overrides(base, args))
}

pub fn parse_config(text: &str) -> Result<ExtractOptions, toml::de::Error> {
    toml::from_str(text)
}

pub fn apply_overrides(mut options: ExtractOptions, args: &OptionArgs) -> ExtractOptions {
    if let Some(strategy) = args.strategy {
        options.table_strategy = strategy.into();
    }
    if args.max_pages.is_some() {
        options.max_pages = args.max_pages;
    }
    if args.timeout_ms.is_some() {
        options.per_page_timeout_ms = args.timeout_ms;
    }
    if args.document_timeout_ms.is_some() {
        options.document_timeout_ms = args.document_timeout_ms;
    }
    if args.password.is_some() {
        options.password.clone_from(&args.password);
    }
    if args.workers.is_some() {
        options.workers = args.workers;
    }
    options
}

pub fn new_extractor(options: ExtractOptions) -> Result<Extractor, i32> {
    Extractor::new(options).map_err(report)
}

/// Exit code for a finished extraction: 0, 2 for a partial failure, 1 otherwise.
pub fn exit_status(status: &DocumentStatus) -> Result<(), i32> {
    match status {
        DocumentStatus::Success => Ok(()),
        DocumentStatus::PartialFailure { failed_pages } => {
            eprintln!("Warning: {} page(s) failed: {failed_pages:?}", failed_pages.len());
            Err(2)
        }
        DocumentStatus::Failure { reason } => Err(report(reason)),
    }
}

/// One positioned piece of text, printed as a JSON line.
#[derive(Debug, Serialize)]
pub struct TextRecord<'a> {
    pub page: usize,
    pub text: &'a str,
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl<'a> TextRecord<'a> {
    pub fn new(page: usize, text: &'a str, bbox: &BBox) -> Self {
        Self {
            page,
            text,
            x0: bbox.x0,
            top: bbox.top,
            x1: bbox.x1,
            bottom: bbox.bottom,
        }
    }
}

pub fn print_records<'a>(records: impl IntoIterator<Item = TextRecord<'a>>) -> Result<(), i32> {
    for record in records {
        let line = serde_json::to_string(&record)
            .map_err(|e| report(PdfError::IoError(e.to_string())))?;
        println!("{line}");
    }
    Ok(())
}
