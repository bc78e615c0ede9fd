//! Repository definition files (`*.repo`)
//!
//! The format is INI-like:
//!
//! ```text
//! # comment
//! [repo-id]
//! name = Some Repo
//! enabled = 1
//! ```
//!
//! Every `[header]` opens a record whose `Repo_id` is the header text; the
//! `key = value` lines that follow belong to it until the next header or
//! the end of the file.

use crate::error::{MaintainError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Key holding the bracketed header of a record
pub const REPO_ID_KEY: &str = "Repo_id";

/// File extension of repository definition files
pub const REPO_FILE_EXTENSION: &str = "repo";

/// One repository definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RepoRecord {
    fields: BTreeMap<String, String>,
}

impl RepoRecord {
    fn new(id: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(REPO_ID_KEY.to_string(), id.to_string());
        Self { fields }
    }

    pub fn id(&self) -> &str {
        self.get(REPO_ID_KEY).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn is_enabled(&self) -> bool {
        self.get("enabled") == Some("1")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for RepoRecord {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

enum ParseState {
    AwaitingHeader,
    AccumulatingBlock(RepoRecord),
}

/// Parse the contents of one repository file
///
/// `source` is only used to name the file in syntax errors.
pub fn parse_repo_config(contents: &str, source: &Path) -> Result<Vec<RepoRecord>> {
    let mut records = Vec::new();
    let mut state = ParseState::AwaitingHeader;

    for line in significant_lines(contents) {
        state = match (state, header_id(line)) {
            (ParseState::AwaitingHeader, None) => {
                return Err(MaintainError::config_syntax(
                    source,
                    "Repo file contains no section headers",
                ));
            }
            (ParseState::AwaitingHeader, Some(id)) => {
                ParseState::AccumulatingBlock(RepoRecord::new(id))
            }
            (ParseState::AccumulatingBlock(record), Some(id)) => {
                records.push(record);
                ParseState::AccumulatingBlock(RepoRecord::new(id))
            }
            (ParseState::AccumulatingBlock(mut record), None) => {
                let (key, value) = line.split_once('=').ok_or_else(|| {
                    MaintainError::config_syntax(
                        source,
                        format!("Parsing error: expected 'key = value', found '{}'", line),
                    )
                })?;
                record
                    .fields
                    .insert(key.trim().to_string(), value.trim().to_string());
                ParseState::AccumulatingBlock(record)
            }
        };
    }

    // Flush the block still open at end of input
    if let ParseState::AccumulatingBlock(record) = state {
        records.push(record);
    }

    debug!("Parsed {} repositories from {}", records.len(), source.display());
    Ok(records)
}

/// Read and parse one repository file
pub fn parse_repo_file(path: &Path) -> Result<Vec<RepoRecord>> {
    let contents = std::fs::read_to_string(path)?;
    parse_repo_config(&contents, path)
}

/// Parse every `*.repo` file in a directory, in file name order
pub fn load_repo_dir(dir: &Path) -> Result<Vec<RepoRecord>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_repo = path.extension().is_some_and(|ext| ext == REPO_FILE_EXTENSION);
        if is_repo && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut repositories = Vec::new();
    for file in &files {
        repositories.extend(parse_repo_file(file)?);
    }
    Ok(repositories)
}

fn significant_lines(contents: &str) -> impl Iterator<Item = &str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn header_id(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']')
}
