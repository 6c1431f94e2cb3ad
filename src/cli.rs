//! CLI struct definitions for the project-sheet command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "project-sheet",
    version = env!("CARGO_PKG_VERSION"),
    about = "Keeps project records in a spreadsheet and serves them to assistant hosts over MCP (stdio)."
)]
pub struct Cli {
    /// Configuration file (TOML). Missing file means defaults.
    #[clap(long, global = true, default_value = crate::core::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
    /// Spreadsheet path; overrides `sheet_path` from the config file.
    #[clap(long, global = true)]
    pub sheet: Option<PathBuf>,
    /// Log filter (e.g. `debug`, `project_sheet=trace`); overrides `[logging] level`.
    #[clap(long, global = true)]
    pub log_level: Option<String>,
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the MCP server on stdin/stdout (default)
    Serve,
    /// Print every project as JSON
    List,
    /// Print projects matching the filters as JSON
    Search {
        /// Exact status
        #[clap(long)]
        status: Option<String>,
        /// Owner, case-insensitive substring
        #[clap(long)]
        owner: Option<String>,
    },
    /// Write a default config file and create an empty sheet
    Init {
        /// Overwrite an existing config file
        #[clap(long)]
        force: bool,
    },
    /// Print the tool schema document
    Tools,
}
