use std::path::Path;

use crate::cli::OptionArgs;
use crate::shared::{TextRecord, load_options, new_extractor, print_records, read_pdf, report};

pub fn run(file: &Path, args: &OptionArgs) -> Result<(), i32> {
    let extractor = new_extractor(load_options(args)?)?;
    let bytes = read_pdf(file)?;
    let pages = extractor.words(&bytes).map_err(report)?;

    print_records(pages.iter().flat_map(|page| {
        page.words
            .iter()
            .map(|w| TextRecord::new(page.page, &w.text, &w.bbox))
    }))
}
