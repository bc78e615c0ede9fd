//! Test utility functions for preupgrade
#![allow(dead_code)]

use preupgrade::core::{ComposedScenario, HostFeatures, Scenario, ScenarioParams, StepState};
use preupgrade::error::Result;
use preupgrade::execution::{ProgressMode, ScenarioReport, ScenarioRunner};
use preupgrade::system::{
    CommandExecutor, CommandOptions, CommandResult, HostSystem, Package, PackageManager,
    PackageOptions, SystemInteraction,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Executor that answers from a table of `command -> (status, output)`
///
/// Unknown commands exit 127 with no output. Every command is recorded.
#[derive(Default)]
pub struct FakeExecutor {
    responses: HashMap<String, (i32, String)>,
    pub commands: RefCell<Vec<String>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, exit_status: i32, output: &str) -> Self {
        self.responses
            .insert(command.to_string(), (exit_status, output.to_string()));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl CommandExecutor for FakeExecutor {
    fn run(&self, command: &str, _options: &CommandOptions) -> Result<CommandResult> {
        self.commands.borrow_mut().push(command.to_string());
        let (exit_status, output) = self
            .responses
            .get(command)
            .cloned()
            .unwrap_or((127, String::new()));
        Ok(CommandResult {
            command: command.to_string(),
            exit_status,
            output,
            stderr: String::new(),
            timed_out: false,
        })
    }
}

/// Package manager with a fixed set of installed packages
#[derive(Default)]
pub struct FakePackages {
    installed: Vec<Package>,
}

impl FakePackages {
    pub fn installed(packages: &[(&str, &str)]) -> Self {
        Self {
            installed: packages
                .iter()
                .map(|(name, version)| Package {
                    name: name.to_string(),
                    version: version.to_string(),
                })
                .collect(),
        }
    }
}

impl PackageManager for FakePackages {
    fn find_installed_package(&self, name: &str) -> Result<Option<Package>> {
        Ok(self.installed.iter().find(|p| p.name == name).cloned())
    }

    fn install(&self, _packages: &[&str], _options: PackageOptions) -> Result<()> {
        Ok(())
    }

    fn update(&self, _packages: &[&str], _options: PackageOptions) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _packages: &[&str], _options: PackageOptions) -> Result<()> {
        Ok(())
    }
}

/// A host backed by fakes, reading repositories from `repos_dir`
pub fn fake_system(
    executor: FakeExecutor,
    packages: FakePackages,
    repos_dir: &Path,
) -> (Rc<dyn SystemInteraction>, Rc<FakeExecutor>) {
    let executor = Rc::new(executor);
    let system = HostSystem::new(executor.clone(), Rc::new(packages), repos_dir);
    (Rc::new(system), executor)
}

/// Directory holding the fixture repo files
pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/yum.repos.d")
}

/// Temporary repos directory holding the given `(file name, contents)` pairs
pub fn repos_dir_with(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (name, contents) in files {
        std::fs::write(dir.path().join(name), contents).expect("Failed to write repo file");
    }
    dir
}

pub fn downstream() -> HostFeatures {
    HostFeatures {
        downstream: true,
        server: true,
        systemd: true,
    }
}

/// Compose and run a scenario with hidden progress
pub fn run_scenario(
    scenario: &dyn Scenario,
    params: ScenarioParams,
    features: HostFeatures,
) -> ScenarioReport {
    let mut composed = ComposedScenario::build(scenario, params).expect("Scenario should compose");
    ScenarioRunner::new(features, ProgressMode::Hidden)
        .run(&mut composed)
        .expect("Scenario should run once")
}

/// Assert a step finished with `expected` state name and (optionally) a message fragment
pub fn assert_step_state(report: &ScenarioReport, label: &str, expected: &str, message: Option<&str>) {
    let step = report
        .steps
        .iter()
        .find(|s| s.label == label)
        .unwrap_or_else(|| panic!("Step '{}' not found in report", label));

    assert_eq!(
        step.state.name(),
        expected,
        "Step '{}' should be {}, got {:?}",
        label,
        expected,
        step.state
    );

    if let Some(fragment) = message {
        let actual = step.state.message().unwrap_or_default();
        assert!(
            actual.contains(fragment),
            "Step '{}' message should contain '{}', got '{}'",
            label,
            fragment,
            actual
        );
    }
}

/// Assert the report lists steps in the given order
pub fn assert_step_order(report: &ScenarioReport, expected: &[&str]) {
    let labels: Vec<&str> = report.steps.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, expected, "Step order mismatch");
}

/// Whether a step never reached `Running`
pub fn was_skipped(report: &ScenarioReport, label: &str) -> bool {
    report
        .steps
        .iter()
        .any(|s| s.label == label && matches!(s.state, StepState::Skipped { .. }))
}
