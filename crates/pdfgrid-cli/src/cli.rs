use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Extract reading-ordered text blocks and tables from PDF documents.
#[derive(Debug, Parser)]
#[command(name = "pdfgrid", about, version)]
pub struct Cli {
    /// Log more to stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract text blocks and tables as JSON
    Extract {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        options: OptionArgs,

        /// Include block bounding boxes in the output
        #[arg(long)]
        bbox: bool,

        /// Write `<id>.json` into this directory instead of stdout
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Document id used as the output file name. Default: the file stem
        #[arg(long, requires = "output_dir")]
        id: Option<String>,
    },

    /// Print positioned words as JSON lines
    Words {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Search words for a pattern, printing matches as JSON lines
    Search {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Pattern to search for (regex by default)
        pattern: String,

        /// Case-insensitive matching
        #[arg(long, short = 'i')]
        case_insensitive: bool,

        /// Match the pattern literally
        #[arg(long)]
        no_regex: bool,

        #[command(flatten)]
        options: OptionArgs,
    },
}

/// Extraction options shared by every subcommand. Each flag overrides the
/// matching field of `--config`.
#[derive(Debug, Clone, Default, Args)]
pub struct OptionArgs {
    /// TOML file with extraction options
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Table detection strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Extract at most this many pages
    #[arg(long, value_name = "N")]
    pub max_pages: Option<usize>,

    /// Per-page time budget in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Whole-document time budget in milliseconds
    #[arg(long, value_name = "MS")]
    pub document_timeout_ms: Option<u64>,

    /// Password for encrypted PDFs
    #[arg(long)]
    pub password: Option<String>,

    /// Page worker threads. Default: one per CPU core
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,
}

/// Table detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Ruling lines and rectangle edges
    Lines,
    /// Column alignment of text
    Text,
    /// Ruling lines, text alignment on pages without any
    Auto,
}

impl From<StrategyArg> for pdfgrid::TableStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Lines => pdfgrid::TableStrategy::Lines,
            StrategyArg::Text => pdfgrid::TableStrategy::Text,
            StrategyArg::Auto => pdfgrid::TableStrategy::Auto,
        }
    }
}
