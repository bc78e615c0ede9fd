//! System interaction layer
//!
//! Steps never shell out or read host files directly. They hold an
//! `Rc<dyn SystemInteraction>` and go through the helpers it provides, which
//! keeps every check testable against a scripted executor.

pub mod command;
pub mod package;
pub mod repo_config;
pub mod version;

pub use command::{CommandExecutor, CommandOptions, CommandResult, ShellExecutor};
pub use package::{Package, PackageAction, PackageManager, PackageOptions, YumPackageManager};
pub use repo_config::{load_repo_dir, parse_repo_config, parse_repo_file, RepoRecord, REPO_ID_KEY};
pub use version::Version;

use crate::core::config::ToolConfig;
use crate::error::{MaintainError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

const SYSTEMCTL_PATH: &str = "/usr/bin/systemctl";

/// Capabilities a step uses to inspect or change the host
pub trait SystemInteraction {
    fn executor(&self) -> &dyn CommandExecutor;

    fn package_manager(&self) -> &dyn PackageManager;

    /// Directory holding the `*.repo` files
    fn repos_dir(&self) -> &Path;

    /// Options applied to every command (e.g. the configured timeout)
    fn command_options(&self) -> CommandOptions {
        CommandOptions::new()
    }

    /// Run a command and return its output whatever the exit status
    fn execute(&self, command: &str) -> Result<String> {
        self.executor()
            .execute_or_default(command, &self.command_options())
    }

    fn execute_or_fail(&self, command: &str) -> Result<String> {
        self.executor()
            .execute_or_fail(command, &self.command_options())
    }

    /// Like `execute_or_fail`, echoing the output live
    fn execute_interactive(&self, command: &str) -> Result<String> {
        let options = self.command_options().with_interactive(true);
        self.executor().execute_or_fail(command, &options)
    }

    fn execute_with_status(&self, command: &str) -> Result<(i32, String)> {
        self.executor()
            .execute_with_status(command, &self.command_options())
    }

    fn test_success(&self, command: &str) -> bool {
        self.executor()
            .test_success(command, &self.command_options())
    }

    fn command_present(&self, name: &str) -> bool {
        self.test_success(&format!("command -v {}", shell_escape(name)))
    }

    fn hostname(&self) -> Result<String> {
        Ok(self.execute("hostname -f")?.trim().to_string())
    }

    fn systemd_installed(&self) -> bool {
        Path::new(SYSTEMCTL_PATH).exists()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn file_nonzero(&self, path: &Path) -> bool {
        std::fs::metadata(path).is_ok_and(|meta| meta.len() > 0)
    }

    fn directory_empty(&self, dir: &Path) -> Result<bool> {
        Ok(std::fs::read_dir(dir)?.next().is_none())
    }

    /// Symlinks directly inside `dir`
    fn find_symlinks(&self, dir: &Path) -> Result<Vec<String>> {
        let command = format!(
            "find {} -maxdepth 1 -type l",
            shell_escape(&dir.to_string_lossy())
        );
        Ok(self
            .execute(&command)?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// Directory under `dir` holding a file named `target`; the last match wins
    fn find_dir_containing_file(&self, dir: &Path, target: &str) -> Result<Option<PathBuf>> {
        let mut found = None;
        walk_for_file(dir, target, &mut found)?;
        Ok(found)
    }

    /// Source device and filesystem type backing `dir`
    fn lv_info(&self, dir: &Path) -> Result<Vec<String>> {
        let command = format!(
            "findmnt -n --target {} -o SOURCE,FSTYPE",
            shell_escape(&dir.to_string_lossy())
        );
        Ok(self
            .execute(&command)?
            .split_whitespace()
            .map(String::from)
            .collect())
    }

    fn create_lv_snapshot(&self, name: &str, block_size: &str, path: &str) -> Result<String> {
        self.execute_or_fail(&format!(
            "lvcreate -n{} -L{} -s {}",
            shell_escape(name),
            shell_escape(block_size),
            shell_escape(path)
        ))
    }

    fn lv_path(&self, lv_name: &str) -> Result<String> {
        let command = format!(
            "lvs --noheadings -o lv_path -S lv_name={}",
            shell_escape(lv_name)
        );
        Ok(self.execute(&command)?.trim().to_string())
    }

    fn find_package(&self, name: &str) -> Result<Option<Package>> {
        self.package_manager().find_installed_package(name)
    }

    /// Whether the server product itself is installed
    fn is_server(&self) -> Result<bool> {
        Ok(self.find_package("foreman")?.is_some())
    }

    fn package_version(&self, name: &str) -> Result<Option<Version>> {
        let command = format!(
            "rpm -q {} --queryformat=\"%{{VERSION}}\"",
            shell_escape(name)
        );
        let (status, output) = self.execute_with_status(&command)?;
        Ok((status == 0).then(|| Version::parse(&output)))
    }

    /// False when the package is not installed
    fn check_min_version(&self, name: &str, minimal: &str) -> Result<bool> {
        Ok(self
            .package_version(name)?
            .is_some_and(|current| current >= Version::parse(minimal)))
    }

    /// False when the package is not installed
    fn check_max_version(&self, name: &str, maximal: &str) -> Result<bool> {
        Ok(self
            .package_version(name)?
            .is_some_and(|current| Version::parse(maximal) >= current))
    }

    fn packages_action(
        &self,
        action: PackageAction,
        packages: &[&str],
        options: PackageOptions,
    ) -> Result<()> {
        let manager = self.package_manager();
        match action {
            PackageAction::Install => manager.install(packages, options),
            PackageAction::Update => manager.update(packages, options),
            PackageAction::Remove => manager.remove(packages, options),
        }
    }

    /// All repository definitions on the host, parsed fresh
    fn repositories(&self) -> Result<Vec<RepoRecord>> {
        load_repo_dir(self.repos_dir())
    }
}

fn walk_for_file(dir: &Path, target: &str, found: &mut Option<PathBuf>) -> Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if entry.file_name() == target {
            *found = Some(dir.to_path_buf());
        }
        if !entry.file_type()?.is_dir() {
            continue;
        }
        // Only the starting directory has to be readable
        match walk_for_file(&path, target, found) {
            Err(MaintainError::Io(e)) if is_skippable(&e) => {
                debug!("Skipping {}: {}", path.display(), e);
            }
            other => other?,
        }
    }
    Ok(())
}

fn is_skippable(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
    )
}

/// The live host: a shell executor and the rpm/yum package manager
pub struct HostSystem {
    executor: Rc<dyn CommandExecutor>,
    packages: Rc<dyn PackageManager>,
    repos_dir: PathBuf,
    timeout: Option<Duration>,
}

impl HostSystem {
    pub fn new(
        executor: Rc<dyn CommandExecutor>,
        packages: Rc<dyn PackageManager>,
        repos_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            packages,
            repos_dir: repos_dir.into(),
            timeout: None,
        }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        let executor: Rc<dyn CommandExecutor> = Rc::new(ShellExecutor::new());
        let timeout = config.command_timeout();
        let packages = Rc::new(YumPackageManager::new(executor.clone()).with_timeout(timeout));
        let mut system = Self::new(executor, packages, &config.repos_dir);
        system.timeout = timeout;
        system
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl SystemInteraction for HostSystem {
    fn executor(&self) -> &dyn CommandExecutor {
        self.executor.as_ref()
    }

    fn package_manager(&self) -> &dyn PackageManager {
        self.packages.as_ref()
    }

    fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }

    fn command_options(&self) -> CommandOptions {
        CommandOptions {
            timeout: self.timeout,
            ..CommandOptions::default()
        }
    }
}

fn shell_safe_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_@%+=:,./-]+$").expect("valid shell pattern"))
}

/// Quote a string for use as one shell word
pub fn shell_escape(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    if shell_safe_pattern().is_match(value) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render `--option value` pairs, each value shell-escaped
pub fn format_shell_args(options: &[(&str, &str)]) -> String {
    options
        .iter()
        .map(|(option, value)| format!(" {} {}", option, shell_escape(value)))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;

    #[test]
    fn test_shell_escape() {
        assert_eq!(shell_escape("foreman"), "foreman");
        assert_eq!(shell_escape("/var/lib/pulp"), "/var/lib/pulp");
        assert_eq!(shell_escape("two words"), "'two words'");
        assert_eq!(shell_escape("it's"), r"'it'\''s'");
        assert_eq!(shell_escape(""), "''");
    }

    #[test]
    fn test_format_shell_args() {
        let rendered = format_shell_args(&[("--name", "my repo"), ("--enabled", "1")]);
        assert_eq!(rendered, " --name 'my repo' --enabled 1");
    }

    #[test]
    fn test_command_present_probe() {
        let executor = ScriptedExecutor::default().respond("command -v lvs", 0, "/usr/sbin/lvs\n");
        let (system, executor, _) = system_with(executor, FakePackages::default(), Path::new("/tmp"));
        assert!(system.command_present("lvs"));
        assert!(!system.command_present("missing-tool"));
        assert_eq!(executor.commands.borrow().len(), 2);
    }

    #[test]
    fn test_lv_helpers() {
        let executor = ScriptedExecutor::default()
            .respond(
                "findmnt -n --target /var/lib/pulp -o SOURCE,FSTYPE",
                0,
                "/dev/mapper/vg-pulp xfs\n",
            )
            .respond("lvs --noheadings -o lv_path -S lv_name=pulp", 0, "  /dev/vg/pulp\n");
        let (system, _, _) = system_with(executor, FakePackages::default(), Path::new("/tmp"));

        assert_eq!(
            system.lv_info(Path::new("/var/lib/pulp")).unwrap(),
            vec!["/dev/mapper/vg-pulp", "xfs"]
        );
        assert_eq!(system.lv_path("pulp").unwrap(), "/dev/vg/pulp");
    }

    #[test]
    fn test_create_snapshot_failure_raises() {
        let (system, _, _) =
            system_with(ScriptedExecutor::default(), FakePackages::default(), Path::new("/tmp"));
        let err = system.create_lv_snapshot("snap", "2G", "/dev/vg/pulp").unwrap_err();
        assert!(matches!(
            err,
            crate::error::MaintainError::CommandExecution { exit_status: 127, .. }
        ));
    }

    #[test]
    fn test_version_checks() {
        let executor = ScriptedExecutor::default()
            .respond("rpm -q foreman --queryformat=\"%{VERSION}\"", 0, "3.1.2");
        let (system, _, _) = system_with(executor, FakePackages::default(), Path::new("/tmp"));

        assert!(system.check_min_version("foreman", "3.0").unwrap());
        assert!(!system.check_min_version("foreman", "3.2").unwrap());
        assert!(system.check_max_version("foreman", "3.1.2").unwrap());
        assert!(!system.check_min_version("katello", "1.0").unwrap());
        assert!(system.package_version("katello").unwrap().is_none());
    }

    #[test]
    fn test_packages_action_dispatch() {
        let (system, _, packages) =
            system_with(ScriptedExecutor::default(), FakePackages::default(), Path::new("/tmp"));
        system
            .packages_action(PackageAction::Update, &["foreman"], PackageOptions::default())
            .unwrap();
        assert_eq!(
            packages.actions.borrow()[0],
            (PackageAction::Update, vec!["foreman".to_string()])
        );
    }

    #[test]
    fn test_is_server() {
        let (system, _, _) = system_with(
            ScriptedExecutor::default(),
            FakePackages::with_installed(&[("foreman", "3.1.2")]),
            Path::new("/tmp"),
        );
        assert!(system.is_server().unwrap());
        assert!(system.find_package("unknown").unwrap().is_none());
    }

    #[test]
    fn test_file_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let (system, _, _) =
            system_with(ScriptedExecutor::default(), FakePackages::default(), dir.path());
        assert!(system.directory_empty(dir.path()).unwrap());

        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("marker.txt"), "x").unwrap();
        std::fs::write(dir.path().join("empty.txt"), "").unwrap();

        assert!(!system.directory_empty(dir.path()).unwrap());
        assert!(system.file_exists(&dir.path().join("empty.txt")));
        assert!(!system.file_nonzero(&dir.path().join("empty.txt")));
        assert!(system.file_nonzero(&nested.join("marker.txt")));
        assert_eq!(
            system.find_dir_containing_file(dir.path(), "marker.txt").unwrap(),
            Some(nested)
        );
        assert_eq!(
            system.find_dir_containing_file(dir.path(), "absent").unwrap(),
            None
        );
    }

    #[test]
    fn test_find_dir_skips_unreadable_subdirectories() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("a-locked");
        let open = dir.path().join("b-open");
        std::fs::create_dir_all(&locked).unwrap();
        std::fs::create_dir_all(&open).unwrap();
        std::fs::write(open.join("marker.txt"), "x").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let (system, _, _) =
            system_with(ScriptedExecutor::default(), FakePackages::default(), dir.path());
        let found = system.find_dir_containing_file(dir.path(), "marker.txt");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(found.unwrap(), Some(open));
    }

    #[test]
    fn test_find_dir_missing_start_is_error() {
        let (system, _, _) =
            system_with(ScriptedExecutor::default(), FakePackages::default(), Path::new("/tmp"));
        let result = system.find_dir_containing_file(Path::new("/nonexistent/preupgrade-dir"), "x");
        assert!(matches!(result, Err(MaintainError::Io(_))));
    }
}
