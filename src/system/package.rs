//! Package manager collaborator

use crate::error::{MaintainError, Result};
use crate::system::command::{CommandExecutor, CommandOptions};
use crate::system::shell_escape;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// An installed package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub name: String,
    pub version: String,
}

/// Options for package transactions
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageOptions {
    /// Answer yes to every prompt
    pub assume_yes: bool,
}

/// Package transaction kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageAction {
    Install,
    Update,
    Remove,
}

impl PackageAction {
    pub const ALL: [PackageAction; 3] = [Self::Install, Self::Update, Self::Remove];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageAction::Install => "install",
            PackageAction::Update => "update",
            PackageAction::Remove => "remove",
        }
    }
}

impl fmt::Display for PackageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageAction {
    type Err = MaintainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| {
                let expected: Vec<_> = Self::ALL.iter().map(PackageAction::as_str).collect();
                MaintainError::argument(format!(
                    "Unexpected action {} expected one of {:?}",
                    s, expected
                ))
            })
    }
}

/// Installs, updates and removes packages on the host
pub trait PackageManager {
    fn find_installed_package(&self, name: &str) -> Result<Option<Package>>;

    fn install(&self, packages: &[&str], options: PackageOptions) -> Result<()>;

    fn update(&self, packages: &[&str], options: PackageOptions) -> Result<()>;

    fn remove(&self, packages: &[&str], options: PackageOptions) -> Result<()>;
}

/// rpm/yum backed package manager
pub struct YumPackageManager {
    executor: Rc<dyn CommandExecutor>,
    timeout: Option<Duration>,
}

impl YumPackageManager {
    pub fn new(executor: Rc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            timeout: None,
        }
    }

    /// Limit every rpm/yum invocation to `timeout` (None = wait forever)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command_options(&self) -> CommandOptions {
        CommandOptions {
            timeout: self.timeout,
            ..CommandOptions::default()
        }
    }

    fn transaction(
        &self,
        action: PackageAction,
        packages: &[&str],
        options: PackageOptions,
    ) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }

        let mut command = format!("yum {}", action);
        if options.assume_yes {
            command.push_str(" -y");
        }
        for package in packages {
            command.push(' ');
            command.push_str(&shell_escape(package));
        }

        info!("Package transaction: {}", command);
        // Without -y yum asks for confirmation, so the terminal is needed
        let run_options = self.command_options().with_interactive(!options.assume_yes);
        self.executor.execute_or_fail(&command, &run_options)?;
        Ok(())
    }
}

impl PackageManager for YumPackageManager {
    fn find_installed_package(&self, name: &str) -> Result<Option<Package>> {
        let command = format!(
            "rpm -q {} --queryformat=\"%{{NAME}} %{{VERSION}}\\n\"",
            shell_escape(name)
        );
        let result = self.executor.run(&command, &self.command_options())?;
        if !result.success() {
            return Ok(None);
        }

        // One line per installed version; the first one is reported
        let first = result.output.lines().next().unwrap_or_default();
        let mut parts = first.split_whitespace();
        Ok(match (parts.next(), parts.next()) {
            (Some(name), Some(version)) => Some(Package {
                name: name.to_string(),
                version: version.to_string(),
            }),
            _ => None,
        })
    }

    fn install(&self, packages: &[&str], options: PackageOptions) -> Result<()> {
        self.transaction(PackageAction::Install, packages, options)
    }

    fn update(&self, packages: &[&str], options: PackageOptions) -> Result<()> {
        self.transaction(PackageAction::Update, packages, options)
    }

    fn remove(&self, packages: &[&str], options: PackageOptions) -> Result<()> {
        self.transaction(PackageAction::Remove, packages, options)
    }
}
