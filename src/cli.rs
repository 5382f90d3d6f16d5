use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "contactmerge")]
#[command(about = "Merges duplicate CRM contacts from a spreadsheet of company names")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Create default configuration file at ./config/contactmerge.toml
    #[arg(long, global = true)]
    pub init: bool,

    /// Verbose logging (use -v for detailed steps, -vv for debug output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log into the CRM and merge duplicate contacts for every company
    /// listed in the input spreadsheet
    Merge {
        /// Spreadsheet (xlsx, xls or csv) holding the company-name column
        #[arg(short, long)]
        input: PathBuf,

        /// Header of the company-name column (overrides config)
        #[arg(long)]
        column: Option<String>,

        /// Directory for failure screenshots (overrides config)
        #[arg(long)]
        screenshot_dir: Option<PathBuf>,

        /// Export execution logs to a file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Deduplicate two spreadsheet columns into a single-column output
    /// and report anomalously frequent values
    Dedupe {
        /// Input spreadsheet (xlsx, xls or csv)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path; derived from the input when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Zero-based index of the first column (overrides config)
        #[arg(long)]
        column1: Option<usize>,

        /// Zero-based index of the second column (overrides config)
        #[arg(long)]
        column2: Option<usize>,

        /// Header of the output column (overrides config)
        #[arg(long)]
        column_name: Option<String>,

        /// Report values occurring more than this many times (overrides config)
        #[arg(long)]
        frequency_limit: Option<usize>,
    },
}
