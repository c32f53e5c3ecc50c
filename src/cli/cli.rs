use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Runs a YAML script of operations against an in-memory file tree.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// The script to run
    pub script: PathBuf,
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Verify the tree's invariants around every mutation
    #[clap(long)]
    pub check_invariants: bool,
}
