use std::path::Path;

use pdfgrid::{SearchOptions, search_words};

use crate::cli::OptionArgs;
use crate::shared::{TextRecord, load_options, new_extractor, print_records, read_pdf, report};

pub fn run(
    file: &Path,
    pattern: &str,
    case_insensitive: bool,
    no_regex: bool,
    args: &OptionArgs,
) -> Result<(), i32> {
    let search = SearchOptions {
        regex: !no_regex,
        case_sensitive: !case_insensitive,
    };
    let regex = search.compile(pattern).map_err(report)?;

    let extractor = new_extractor(load_options(args)?)?;
    let bytes = read_pdf(file)?;
    let pages = extractor.words(&bytes).map_err(report)?;

    let matches = search_words(&pages, &regex);
    tracing::info!(pattern, matches = matches.len(), "search finished");
    print_records(
        matches
            .iter()
            .map(|m| TextRecord::new(m.page, &m.text, &m.bbox)),
    )
}
