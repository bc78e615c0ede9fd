use anyhow::{Context, Result};
use preupgrade::cli::commands::{CheckCommand, ListCommand, PrepUpgradeCommand, ReposCommand};
use preupgrade::cli::output::*;
use preupgrade::cli::{exit_code, Cli, Command};
use preupgrade::core::config::ToolConfig;
use preupgrade::core::{
    ComposedScenario, ContextValue, HostFeatures, Scenario, ScenarioParams, StepMetadata,
    ARGUMENTS,
};
use preupgrade::definitions::{all_steps, InstallerRun, PrepForUpgrade, TaggedChecks};
use preupgrade::execution::{ProgressMode, ScenarioRunner};
use preupgrade::system::{load_repo_dir, HostSystem, SystemInteraction};
use std::rc::Rc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let config = ToolConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let system: Rc<dyn SystemInteraction> = Rc::new(HostSystem::from_config(&config));

    // Execute command
    let code = match &cli.command {
        Command::PrepUpgrade(cmd) => prep_upgrade(cmd, &config, &system)?,
        Command::Check(cmd) => run_checks(cmd, &config, &system)?,
        Command::List(cmd) => {
            list_steps(cmd, &config, &system)?;
            0
        }
        Command::Repos(cmd) => {
            show_repos(cmd, &config)?;
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn prep_upgrade(
    cmd: &PrepUpgradeCommand,
    config: &ToolConfig,
    system: &Rc<dyn SystemInteraction>,
) -> Result<i32> {
    let scenario = PrepForUpgrade::new(system.clone(), config.installer.clone())
        .with_extra_arguments(config.arguments_for(InstallerRun::LABEL).to_vec());
    let params =
        ScenarioParams::new().set(PrepForUpgrade::HOSTNAME_PARAM, cmd.satellite_hostname.clone());

    run_scenario(&scenario, params, config, system, cmd.json, cmd.fail_on_warning)
}

fn run_checks(cmd: &CheckCommand, config: &ToolConfig, system: &Rc<dyn SystemInteraction>) -> Result<i32> {
    let scenario = TaggedChecks::new(system.clone(), config.installer.clone(), cmd.filter());
    run_scenario(&scenario, ScenarioParams::new(), config, system, cmd.json, cmd.fail_on_warning)
}

fn run_scenario(
    scenario: &dyn Scenario,
    params: ScenarioParams,
    config: &ToolConfig,
    system: &Rc<dyn SystemInteraction>,
    json: bool,
    fail_on_warning: bool,
) -> Result<i32> {
    let mut composed = ComposedScenario::build(scenario, params)
        .with_context(|| format!("Failed to compose scenario '{}'", scenario.label()))?;

    if composed.steps().is_empty() {
        println!("{} No steps selected", WARN);
        return Ok(0);
    }

    // Configured arguments never replace what the scenario bound itself
    let labels: Vec<String> = composed.labels().iter().map(|label| label.to_string()).collect();
    for label in &labels {
        let arguments = config.arguments_for(label);
        if !arguments.is_empty() && !composed.context().contains(ARGUMENTS, label) {
            composed
                .bind_context()
                .bind(ARGUMENTS, label, ContextValue::from(arguments.to_vec()))?;
        }
    }

    let features = HostFeatures::detect(system.as_ref()).with_overrides(&config.features);
    let progress = if json { ProgressMode::Hidden } else { ProgressMode::detect() };
    let mut runner = ScenarioRunner::new(features, progress);

    // Set up event handler for console output
    if !json {
        runner.add_event_handler(|event| println!("{}", format_run_event(event)));
    }

    let report = runner.run(&mut composed)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_report_summary(&report));
    }

    Ok(exit_code(report.status, fail_on_warning))
}

fn list_steps(cmd: &ListCommand, config: &ToolConfig, system: &Rc<dyn SystemInteraction>) -> Result<()> {
    let filter = cmd.filter();
    let steps = all_steps(system, &config.installer);
    let selected: Vec<&StepMetadata> = steps
        .iter()
        .map(|step| step.metadata())
        .filter(|metadata| filter.matches(metadata))
        .collect();

    if cmd.json {
        let data = serde_json::json!({ "steps": selected });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if selected.is_empty() {
        println!("{} No steps found", INFO);
        return Ok(());
    }

    println!("{} Known steps:", INFO);
    for metadata in selected {
        println!("  {}", format_step_metadata(metadata));
    }
    Ok(())
}

fn show_repos(cmd: &ReposCommand, config: &ToolConfig) -> Result<()> {
    let dir = cmd.dir.as_deref().unwrap_or(config.repos_dir.as_path());
    let repos = load_repo_dir(dir)
        .with_context(|| format!("Failed to read repositories from {}", dir.display()))?;

    if cmd.json {
        let data = serde_json::json!({ "repositories": repos });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if repos.is_empty() {
        println!("{} No repositories defined in {}", INFO, dir.display());
        return Ok(());
    }

    for repo in &repos {
        println!("{}", format_repo(repo));
    }
    println!("\n{} {} repositories", INFO, style(repos.len()).cyan());
    Ok(())
}
