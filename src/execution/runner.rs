//! Scenario runner - drives a composed scenario to completion
//!
//! Steps run one at a time in composition order. A step that is not
//! applicable to the host is skipped. A step that fails, whether through
//! an error or a panic, is recorded as a failure and the remaining steps
//! still run.

use crate::core::{
    ComposedScenario, HostFeatures, ScenarioStatus, StepKind, StepRun, StepSlot, StepState,
};
use crate::error::Result;
use crate::execution::reporter::{ProgressMode, Spinner};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events emitted while a scenario runs
#[derive(Debug, Clone)]
pub enum RunEvent {
    ScenarioStarted {
        execution_id: Uuid,
        scenario: String,
        steps: usize,
    },
    StepStarted {
        label: String,
        description: String,
    },
    StepSkipped {
        label: String,
        reason: String,
    },
    StepFinished {
        label: String,
        description: String,
        state: StepState,
    },
    ScenarioFinished {
        execution_id: Uuid,
        status: ScenarioStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Box<dyn Fn(&RunEvent)>;

/// Outcome of one step in a finished run
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub label: String,
    pub description: String,
    pub kind: StepKind,
    pub state: StepState,
}

/// Outcome of a finished scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub execution_id: Uuid,
    pub scenario: String,
    pub description: String,
    pub status: ScenarioStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
}

impl ScenarioReport {
    /// `(label, message)` for every failed step
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.steps_in("failure")
    }

    /// `(label, message)` for every step that finished with warnings
    pub fn warnings(&self) -> Vec<(&str, &str)> {
        self.steps_in("warning")
    }

    fn steps_in(&self, state: &str) -> Vec<(&str, &str)> {
        self.steps
            .iter()
            .filter(|step| step.state.name() == state)
            .map(|step| (step.label.as_str(), step.state.message().unwrap_or_default()))
            .collect()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Runs composed scenarios against one host
pub struct ScenarioRunner {
    features: HostFeatures,
    progress: ProgressMode,
    event_handlers: Vec<EventHandler>,
}

impl ScenarioRunner {
    pub fn new(features: HostFeatures, progress: ProgressMode) -> Self {
        Self {
            features,
            progress,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&RunEvent) + 'static,
    {
        self.event_handlers.push(Box::new(handler));
    }

    fn emit_event(&self, event: RunEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Execute every step of `scenario` in order
    ///
    /// Fails only if the scenario was already executed; step failures are
    /// recorded in the returned report.
    pub fn run(&self, scenario: &mut ComposedScenario) -> Result<ScenarioReport> {
        scenario.begin()?;

        let execution_id = scenario.execution_id();
        let name = scenario.label().to_string();
        let description = scenario.description().to_string();
        let started_at = Utc::now();

        info!("Starting scenario: {} ({})", name, execution_id);
        self.emit_event(RunEvent::ScenarioStarted {
            execution_id,
            scenario: name.clone(),
            steps: scenario.steps().len(),
        });

        {
            let (slots, context) = scenario.parts_mut();
            for slot in slots.iter_mut() {
                let label = slot.step.label().to_string();
                let step_description = slot.step.metadata().description.clone();

                let step = &slot.step;
                let applicable = panic::catch_unwind(AssertUnwindSafe(|| step.confine(&self.features)));
                match applicable {
                    Ok(true) => {}
                    Ok(false) => {
                        let reason = "not applicable to this host".to_string();
                        debug!("Skipping step {}: {}", label, reason);
                        transition(slot, StepState::Skipped { reason: reason.clone() });
                        self.emit_event(RunEvent::StepSkipped { label, reason });
                        continue;
                    }
                    Err(payload) => {
                        let message = format!(
                            "applicability check panicked: {}",
                            panic_message(payload.as_ref())
                        );
                        error!("Step {} {}", label, message);
                        let now = Utc::now();
                        transition(slot, StepState::Running { started_at: now });
                        let state = StepState::Failure {
                            message,
                            started_at: now,
                            finished_at: now,
                        };
                        transition(slot, state.clone());
                        self.emit_event(RunEvent::StepFinished {
                            label,
                            description: step_description,
                            state,
                        });
                        continue;
                    }
                }

                let step_started = Utc::now();
                transition(slot, StepState::Running { started_at: step_started });
                info!("Running step: {}", label);
                self.emit_event(RunEvent::StepStarted {
                    label: label.clone(),
                    description: step_description.clone(),
                });

                let (result, warnings) = {
                    let spinner = Spinner::start(self.progress, &step_description);
                    let mut run = StepRun::new(&label, context, &spinner);
                    let step = &slot.step;
                    let result = panic::catch_unwind(AssertUnwindSafe(|| step.run(&mut run)));
                    (result, run.into_warnings())
                };

                let finished_at = Utc::now();
                let state = match result {
                    Ok(Ok(())) if warnings.is_empty() => StepState::Success {
                        started_at: step_started,
                        finished_at,
                    },
                    Ok(Ok(())) => {
                        let message = warnings.join("; ");
                        warn!("Step {} finished with warnings: {}", label, message);
                        StepState::Warning {
                            message,
                            started_at: step_started,
                            finished_at,
                        }
                    }
                    Ok(Err(e)) => {
                        error!("Step {} failed: {}", label, e);
                        StepState::Failure {
                            message: e.to_string(),
                            started_at: step_started,
                            finished_at,
                        }
                    }
                    Err(payload) => {
                        let message = format!("step panicked: {}", panic_message(payload.as_ref()));
                        error!("Step {} {}", label, message);
                        StepState::Failure {
                            message,
                            started_at: step_started,
                            finished_at,
                        }
                    }
                };

                transition(slot, state.clone());
                self.emit_event(RunEvent::StepFinished {
                    label,
                    description: step_description,
                    state,
                });
            }
        }

        let status = scenario.status();
        info!("Scenario {} finished: {}", name, status);
        self.emit_event(RunEvent::ScenarioFinished {
            execution_id,
            status,
        });

        Ok(ScenarioReport {
            execution_id,
            scenario: name,
            description,
            status,
            started_at,
            finished_at: Utc::now(),
            steps: scenario
                .steps()
                .iter()
                .map(|slot| StepReport {
                    label: slot.step.label().to_string(),
                    description: slot.step.metadata().description.clone(),
                    kind: slot.step.metadata().kind,
                    state: slot.state.clone(),
                })
                .collect(),
        })
    }
}

fn transition(slot: &mut StepSlot, next: StepState) {
    debug_assert!(
        slot.state.can_transition_to(&next),
        "invalid step transition {} -> {}",
        slot.state,
        next
    );
    slot.state = next;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
