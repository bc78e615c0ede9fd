//! End-to-end scenario runs against a faked host

mod helpers;

use helpers::*;
use preupgrade::core::{HostFeatures, ScenarioParams, ScenarioStatus};
use preupgrade::definitions::{
    InstallerRun, NonRhRepositoryCheck, PrepForUpgrade, RequiredCommandsCheck, StepFilter,
    TaggedChecks,
};

const INSTALLER_COMMAND: &str =
    "satellite-installer --foreman-proxy-foreman-base-url=https://sat7.example.com";

const EPEL_REPO: &str = "[epel]\nname=Extra Packages\nbaseurl=http://download.example/pub/epel/8/\nenabled=1\n";
const RHEL_REPO: &str = "[rhel-8-baseos]\nname=BaseOS\nbaseurl=https://cdn.example/rhel8/baseos\nenabled=1\n";

fn prep_params() -> ScenarioParams {
    ScenarioParams::new().set(PrepForUpgrade::HOSTNAME_PARAM, "sat7.example.com")
}

#[test]
fn test_prep_upgrade_clean_host() {
    let dir = repos_dir_with(&[("rhel.repo", RHEL_REPO)]);
    let (system, executor) = fake_system(
        FakeExecutor::new().respond(INSTALLER_COMMAND, 0, "Installer finished"),
        FakePackages::default(),
        dir.path(),
    );

    let report = run_scenario(&PrepForUpgrade::new(system, "satellite-installer"), prep_params(), downstream());

    assert_eq!(report.status, ScenarioStatus::Success);
    assert_step_order(&report, &[NonRhRepositoryCheck::LABEL, InstallerRun::LABEL]);
    assert_step_state(&report, NonRhRepositoryCheck::LABEL, "success", None);
    assert_step_state(&report, InstallerRun::LABEL, "success", None);
    assert_eq!(executor.commands(), vec![INSTALLER_COMMAND]);
}

#[test]
fn test_prep_upgrade_with_epel_fails_but_keeps_going() {
    let dir = repos_dir_with(&[("epel.repo", EPEL_REPO), ("rhel.repo", RHEL_REPO)]);
    let (system, executor) = fake_system(
        FakeExecutor::new().respond(INSTALLER_COMMAND, 0, ""),
        FakePackages::default(),
        dir.path(),
    );

    let report = run_scenario(&PrepForUpgrade::new(system, "satellite-installer"), prep_params(), downstream());

    assert_eq!(report.status, ScenarioStatus::Failure);
    assert_step_state(&report, NonRhRepositoryCheck::LABEL, "failure", Some("epel"));
    assert_step_state(&report, InstallerRun::LABEL, "success", None);
    assert_eq!(executor.commands(), vec![INSTALLER_COMMAND]);
}

#[test]
fn test_prep_upgrade_upstream_skips_repository_check() {
    let dir = repos_dir_with(&[("epel.repo", EPEL_REPO)]);
    let (system, _) = fake_system(
        FakeExecutor::new().respond(INSTALLER_COMMAND, 0, ""),
        FakePackages::default(),
        dir.path(),
    );

    let report = run_scenario(
        &PrepForUpgrade::new(system, "satellite-installer"),
        prep_params(),
        HostFeatures::default(),
    );

    assert!(was_skipped(&report, NonRhRepositoryCheck::LABEL));
    assert_eq!(report.status, ScenarioStatus::Success);
}

#[test]
fn test_prep_upgrade_installer_failure() {
    let dir = repos_dir_with(&[("rhel.repo", RHEL_REPO)]);
    let (system, _) = fake_system(
        FakeExecutor::new().respond(INSTALLER_COMMAND, 6, "Puppet run failed"),
        FakePackages::default(),
        dir.path(),
    );

    let report = run_scenario(&PrepForUpgrade::new(system, "satellite-installer"), prep_params(), downstream());

    assert_eq!(report.status, ScenarioStatus::Failure);
    assert_step_state(&report, InstallerRun::LABEL, "failure", Some("exited with status 6: Puppet run failed"));
}

#[test]
fn test_prep_upgrade_extra_arguments_follow_generated_ones() {
    let dir = repos_dir_with(&[]);
    let command = format!("{} --verbose-log-level=debug", INSTALLER_COMMAND);
    let (system, executor) = fake_system(
        FakeExecutor::new().respond(&command, 0, ""),
        FakePackages::default(),
        dir.path(),
    );

    let scenario = PrepForUpgrade::new(system, "satellite-installer")
        .with_extra_arguments(vec!["--verbose-log-level=debug".to_string()]);
    let report = run_scenario(&scenario, prep_params(), downstream());

    assert_eq!(report.status, ScenarioStatus::Success);
    assert_eq!(executor.commands(), vec![command]);
}

#[test]
fn test_tagged_checks_warn_on_missing_commands() {
    let dir = repos_dir_with(&[("rhel.repo", RHEL_REPO)]);
    let (system, _) = fake_system(
        FakeExecutor::new()
            .respond("command -v rpm", 0, "/usr/bin/rpm")
            .respond("command -v findmnt", 0, "/usr/bin/findmnt"),
        FakePackages::default(),
        dir.path(),
    );

    let filter = StepFilter {
        tags: vec!["pre_upgrade".to_string()],
        labels: Vec::new(),
    };
    let report = run_scenario(
        &TaggedChecks::new(system, "satellite-installer", filter),
        ScenarioParams::new(),
        downstream(),
    );

    assert_step_order(&report, &[NonRhRepositoryCheck::LABEL, RequiredCommandsCheck::LABEL]);
    assert_step_state(&report, NonRhRepositoryCheck::LABEL, "success", None);
    assert_step_state(&report, RequiredCommandsCheck::LABEL, "warning", Some("lvs"));
    assert_eq!(report.status, ScenarioStatus::Warning);
}

#[test]
fn test_broken_repo_file_fails_the_check() {
    let dir = repos_dir_with(&[("broken.repo", "baseurl=http://nowhere\n")]);
    let (system, _) = fake_system(FakeExecutor::new(), FakePackages::default(), dir.path());

    let filter = StepFilter {
        tags: Vec::new(),
        labels: vec![NonRhRepositoryCheck::LABEL.to_string()],
    };
    let report = run_scenario(
        &TaggedChecks::new(system, "satellite-installer", filter),
        ScenarioParams::new(),
        downstream(),
    );

    assert_step_state(&report, NonRhRepositoryCheck::LABEL, "failure", Some("no section headers"));
}
