use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod check;
pub mod filter;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read candump text and print frames that pass the filters.
    Filter(FilterArgs),
    /// Strictly parse frame texts and print their fields.
    Check(CheckArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Filter(args) => filter::run(args, format),
        Command::Check(args) => check::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Filters such as 123, 123:7ff, 123~7ff, 100-1ff or 100_1ff.
    pub filters: Vec<String>,
    /// Read additional filters from a file (one or more per line, # comments).
    #[arg(long, value_name = "PATH")]
    pub filter_file: Option<PathBuf>,
    /// Only deliver frames whose header matches exactly (hex, 8 digits for extended).
    #[arg(long, value_name = "HEADER")]
    pub id: Option<String>,
    /// Input file. Default: stdin.
    #[arg(long, short = 'i', value_name = "PATH")]
    pub input: Option<PathBuf>,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Frame texts, e.g. 123#deadbeef or 0001abcd#.
    #[arg(required = true)]
    pub frames: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}
