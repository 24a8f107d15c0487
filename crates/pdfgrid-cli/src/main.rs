mod cli;
mod extract_cmd;
mod search_cmd;
mod shared;
mod words_cmd;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    shared::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Extract {
            ref file,
            ref options,
            bbox,
            ref output_dir,
            ref id,
        } => extract_cmd::run(file, options, bbox, output_dir.as_deref(), id.as_deref()),
        Commands::Words {
            ref file,
            ref options,
        } => words_cmd::run(file, options),
        Commands::Search {
            ref file,
            ref pattern,
            case_insensitive,
            no_regex,
            ref options,
        } => search_cmd::run(file, pattern, case_insensitive, no_regex, options),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
