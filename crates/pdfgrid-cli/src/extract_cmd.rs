use std::path::Path;
use std::time::Instant;

use pdfgrid::{is_valid_doc_id, to_json, write_result};
use tracing::info;

use crate::cli::OptionArgs;
use crate::shared::{exit_status, load_options, new_extractor, read_pdf, report};

pub fn run(
    file: &Path,
    args: &OptionArgs,
    bbox: bool,
    output_dir: Option<&Path>,
    id: Option<&str>,
) -> Result<(), i32> {
    let mut options = load_options(args)?;
    options.include_bbox |= bbox;
    let extractor = new_extractor(options)?;
    let bytes = read_pdf(file)?;

    let started = Instant::now();
    let result = extractor.extract(&bytes);
    info!(
        file = %file.display(),
        status = result.status.as_str(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "extract finished"
    );

    match output_dir {
        Some(dir) => {
            let id = match id {
                Some(id) => id.to_string(),
                None => default_id(file)?,
            };
            let path = write_result(dir, &id, &result).map_err(report)?;
            info!(path = %path.display(), "result persisted");
        }
        None => println!("{}", to_json(&result).map_err(report)?),
    }

    exit_status(&result.status)
}

/// The input file stem, when usable as a document id.
fn default_id(file: &Path) -> Result<String, i32> {
    file.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| is_valid_doc_id(s))
        .map(str::to_string)
        .ok_or_else(|| {
            report(format!(
                "cannot derive a document id from {}; pass --id",
                file.display()
            ))
        })
}
