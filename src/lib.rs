//! project-sheet: project records in a spreadsheet, served over MCP.
//!
//! An assistant host (any MCP client) spawns the binary and
//! calls six tools: `get_projects`, `get_project`, `add_project`,
//! `update_project`, `delete_project` and `search_projects`. The records live in
//! one `.xlsx` file that people can also open and read by hand.
//!
//! # Architecture
//!
//! - [`core::store::RecordStore`] is the only component that touches the file.
//!   Every mutation is a whole-file read-modify-write with an atomic rename and
//!   a fingerprint check against edits made behind its back.
//! - [`core::query`] filters a snapshot by status and owner.
//! - [`plugins::projects`] turns tool arguments into validated calls.
//! - [`core::rpc`] speaks JSON-RPC 2.0 line by line on stdio.
//!
//! # Examples
//!
//! ```bash
//! # Create project-sheet.toml and an empty projects.xlsx
//! project-sheet init
//!
//! # Serve the tools to an MCP host (default command)
//! project-sheet serve
//!
//! # Inspect from a terminal
//! project-sheet search --status "In Progress"
//! ```

pub mod cli;
pub mod core;
pub mod plugins;

use crate::cli::{Cli, Command};
use crate::core::config::{Config, ConfigSource};
use crate::core::query::Criteria;
use crate::core::store::RecordStore;
use crate::core::{logging, rpc};
use crate::plugins::projects;
use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub fn run() -> anyhow::Result<()> {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> anyhow::Result<()> {
    let (mut config, source) = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    if let Some(sheet) = cli.sheet {
        config.sheet_path = sheet;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    let command = cli.command.unwrap_or(Command::Serve);

    let log_file = config.resolved_log_file()?;
    logging::init(&config.logging, log_file.as_deref()).context("failed to set up logging")?;
    match &source {
        ConfigSource::File(path) => info!(path = %path.display(), "loaded configuration"),
        ConfigSource::Defaults if !matches!(command, Command::Init { .. }) => warn!(
            path = %cli.config.display(),
            "config file not found; using defaults"
        ),
        ConfigSource::Defaults => {}
    }

    let sheet_path = config.resolved_sheet_path()?;
    match command {
        Command::Serve => {
            let mut store = open_store(&sheet_path)?;
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            rpc::serve(&mut store, stdin.lock(), stdout.lock()).context("MCP session failed")?;
        }
        Command::List => {
            let store = open_store(&sheet_path)?;
            print_json(&store.list_all()?)?;
        }
        Command::Search { status, owner } => {
            let store = open_store(&sheet_path)?;
            let criteria = Criteria { status, owner };
            print_json(&store.search(&criteria)?)?;
        }
        Command::Init { force } => init_project(&cli.config, &config, force)?,
        Command::Tools => print_json(&projects::schema())?,
    }
    Ok(())
}

fn open_store(path: &Path) -> anyhow::Result<RecordStore> {
    RecordStore::open(path).with_context(|| format!("failed to open sheet {}", path.display()))
}

fn init_project(config_path: &Path, config: &Config, force: bool) -> anyhow::Result<()> {
    let write_config = force || !config_path.exists();
    if write_config {
        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(config_path, config.to_toml_string()?)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        info!(path = %config_path.display(), "wrote configuration");
    } else {
        info!(path = %config_path.display(), "kept existing configuration");
    }

    let sheet_path = config.resolved_sheet_path()?;
    let store = open_store(&sheet_path)?;
    print_json(&serde_json::json!({
        "config": config_path,
        "config_written": write_config,
        "sheet": store.path(),
        "projects": store.list_all()?.len(),
    }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
