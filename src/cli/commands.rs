//! CLI command definitions

use crate::definitions::StepFilter;
use clap::Args;
use std::path::PathBuf;

/// Prepare the server for upgrade
#[derive(Debug, Args, Clone)]
pub struct PrepUpgradeCommand {
    /// Hostname of the upgraded server
    #[arg(long)]
    pub satellite_hostname: String,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit non-zero when any step warns
    #[arg(long)]
    pub fail_on_warning: bool,
}

/// Run checks selected by tag or label
#[derive(Debug, Args, Clone)]
pub struct CheckCommand {
    /// Only run checks with this tag (repeatable)
    #[arg(short, long)]
    pub tag: Vec<String>,

    /// Only run the check with this label (repeatable)
    #[arg(short, long)]
    pub label: Vec<String>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit non-zero when any check warns
    #[arg(long)]
    pub fail_on_warning: bool,
}

impl CheckCommand {
    pub fn filter(&self) -> StepFilter {
        StepFilter {
            tags: self.tag.clone(),
            labels: self.label.clone(),
        }
    }
}

/// List known checks and procedures
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Only list steps with this tag (repeatable)
    #[arg(short, long)]
    pub tag: Vec<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl ListCommand {
    pub fn filter(&self) -> StepFilter {
        StepFilter {
            tags: self.tag.clone(),
            labels: Vec::new(),
        }
    }
}

/// Show the repository definitions found on the host
#[derive(Debug, Args, Clone)]
pub struct ReposCommand {
    /// Directory to read instead of the configured one
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
