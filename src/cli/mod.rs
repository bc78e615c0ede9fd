//! Command-line interface

pub mod commands;
pub mod output;

use crate::core::ScenarioStatus;
use clap::{Parser, Subcommand};
use commands::{CheckCommand, ListCommand, PrepUpgradeCommand, ReposCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Pre-upgrade checks and preparation for the server
#[derive(Debug, Parser, Clone)]
#[command(name = "preupgrade")]
#[command(version)]
#[command(about = "Checks and prepares a server before a major upgrade", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Prepare the server for upgrade
    PrepUpgrade(PrepUpgradeCommand),

    /// Run checks
    Check(CheckCommand),

    /// List known steps
    List(ListCommand),

    /// Show parsed repository definitions
    Repos(ReposCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

/// Process exit code for a finished run
pub fn exit_code(status: ScenarioStatus, fail_on_warning: bool) -> i32 {
    match status {
        ScenarioStatus::Success => 0,
        ScenarioStatus::Warning if !fail_on_warning => 0,
        ScenarioStatus::Warning | ScenarioStatus::Failure => 1,
    }
}
