//! CLI output formatting

use crate::core::{ScenarioStatus, StepMetadata, StepState};
use crate::execution::{RunEvent, ScenarioReport};
use crate::system::{RepoRecord, REPO_ID_KEY};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::NotRun => style("NOT RUN").dim().to_string(),
        StepState::Running { .. } => style("RUNNING").yellow().to_string(),
        StepState::Success { .. } => style("OK").green().to_string(),
        StepState::Warning { .. } => style("WARNING").yellow().to_string(),
        StepState::Failure { .. } => style("FAIL").red().to_string(),
        StepState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format an aggregate status for display
pub fn format_status(status: ScenarioStatus) -> String {
    match status {
        ScenarioStatus::Success => style("SUCCESS").green().to_string(),
        ScenarioStatus::Warning => style("WARNING").yellow().to_string(),
        ScenarioStatus::Failure => style("FAILURE").red().to_string(),
    }
}

fn state_icon(state: &StepState) -> &'static Emoji<'static, 'static> {
    match state {
        StepState::Success { .. } => &CHECK,
        StepState::Warning { .. } => &WARN,
        StepState::Failure { .. } => &CROSS,
        StepState::Skipped { .. } => &SKIP,
        StepState::NotRun | StepState::Running { .. } => &SPINNER,
    }
}

/// Format a run event for display
pub fn format_run_event(event: &RunEvent) -> String {
    match event {
        RunEvent::ScenarioStarted {
            execution_id,
            scenario,
            steps,
        } => format!(
            "{} Running {} ({} steps, {})",
            ROCKET,
            style(scenario).bold(),
            steps,
            style(&execution_id.to_string()[..8]).dim()
        ),
        RunEvent::StepStarted { label, .. } => {
            format!("{} {}", SPINNER, style(label).cyan())
        }
        RunEvent::StepSkipped { label, reason } => {
            format!("{} {}: {}", SKIP, style(label).dim(), style(reason).dim())
        }
        RunEvent::StepFinished {
            description, state, ..
        } => {
            let line = format!(
                "{}{} [{}]",
                state_icon(state),
                description,
                format_step_state(state)
            );
            match state.message() {
                Some(message) => format!("{}\n   {}", line, style(message).dim()),
                None => line,
            }
        }
        RunEvent::ScenarioFinished {
            execution_id,
            status,
        } => format!(
            "{} Scenario ({}) finished: {}",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

fn separator() -> String {
    let width = term_size::dimensions_stdout()
        .map(|(w, _)| w)
        .unwrap_or(80);
    "─".repeat(width)
}

/// Summary block printed after a run
pub fn format_report_summary(report: &ScenarioReport) -> String {
    let mut lines = vec![separator()];
    lines.push(format!(
        "{} {} in {:.1}s",
        format_status(report.status),
        style(&report.description).bold(),
        report.duration().num_milliseconds() as f64 / 1000.0
    ));

    let failures = report.failures();
    if !failures.is_empty() {
        lines.push(format!("{} Failed steps:", CROSS));
        for (label, message) in failures {
            lines.push(format!("   {}: {}", style(label).red(), message));
        }
    }

    let warnings = report.warnings();
    if !warnings.is_empty() {
        lines.push(format!("{} Steps with warnings:", WARN));
        for (label, message) in warnings {
            lines.push(format!("   {}: {}", style(label).yellow(), message));
        }
    }

    lines.join("\n")
}

/// One line per step in `list`
pub fn format_step_metadata(metadata: &StepMetadata) -> String {
    let tags: Vec<&str> = metadata.tags.iter().map(String::as_str).collect();
    let tags = if tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", tags.join(", "))
    };
    format!(
        "{} {} ({}){}",
        style(&metadata.label).cyan(),
        metadata.description,
        metadata.kind,
        style(tags).dim()
    )
}

/// Repository record with its remaining fields indented below the id
pub fn format_repo(repo: &RepoRecord) -> String {
    let state = if repo.is_enabled() {
        style("enabled").green()
    } else {
        style("disabled").dim()
    };
    let mut lines = vec![format!("{} ({})", style(repo.id()).bold(), state)];
    for (key, value) in repo.fields() {
        if key != REPO_ID_KEY {
            lines.push(format!("   {} = {}", key, value));
        }
    }
    lines.join("\n")
}
