//! Step domain model
//!
//! A step is either a check (inspects the host) or a procedure (changes
//! it). Each one carries metadata for selection, an applicability predicate
//! and a `run` behavior. The run behavior reports problems by returning an
//! error (usually through [`StepRun::assert`]) or by recording warnings.

use crate::core::context::{ContextValue, ScenarioContext};
use crate::core::features::HostFeatures;
use crate::error::{MaintainError, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Whether a step inspects or changes the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Check,
    Procedure,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Check => f.write_str("check"),
            StepKind::Procedure => f.write_str("procedure"),
        }
    }
}

/// Descriptive metadata used for selection and reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepMetadata {
    /// Unique label (also the step's context identity)
    pub label: String,

    /// Human-readable description
    pub description: String,

    /// Selection tags such as `pre_upgrade`
    pub tags: BTreeSet<String>,

    pub kind: StepKind,
}

impl StepMetadata {
    pub fn check(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(label, description, StepKind::Check)
    }

    pub fn procedure(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(label, description, StepKind::Procedure)
    }

    fn new(label: impl Into<String>, description: impl Into<String>, kind: StepKind) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            tags: BTreeSet::new(),
            kind,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Receives progress messages while a step runs
pub trait ProgressSink {
    fn set_message(&self, message: &str);

    /// Hide progress output while `f` writes to the terminal
    fn suspend(&self, f: &mut dyn FnMut());
}

/// A check or procedure
pub trait Step {
    fn metadata(&self) -> &StepMetadata;

    /// Whether the step applies to this host; inapplicable steps are skipped
    fn confine(&self, _features: &HostFeatures) -> bool {
        true
    }

    fn run(&self, run: &mut StepRun<'_>) -> Result<()>;

    fn label(&self) -> &str {
        &self.metadata().label
    }
}

/// Handle given to a step for the duration of its run
pub struct StepRun<'a> {
    label: &'a str,
    context: &'a mut ScenarioContext,
    progress: &'a dyn ProgressSink,
    warnings: Vec<String>,
}

impl<'a> StepRun<'a> {
    pub fn new(
        label: &'a str,
        context: &'a mut ScenarioContext,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            label,
            context,
            progress,
            warnings: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        self.label
    }

    pub fn context(&self) -> &ScenarioContext {
        &*self.context
    }

    /// Extra arguments bound to this step (empty when unbound)
    pub fn arguments(&self) -> &[String] {
        self.context.arguments(self.label)
    }

    /// Share a value with the steps that run after this one
    pub fn publish(&mut self, name: &str, value: ContextValue) -> Result<()> {
        self.context.publish(name, self.label, value)
    }

    /// Fail the step with `message` unless `condition` holds
    pub fn assert(&self, condition: bool, message: impl Into<String>) -> Result<()> {
        if condition {
            Ok(())
        } else {
            Err(MaintainError::assertion(message))
        }
    }

    /// Record a warning; the step still completes
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn set_status(&self, message: &str) {
        self.progress.set_message(message);
    }

    /// Run `f` with progress output hidden, for commands that talk to the terminal
    pub fn interactive<R>(&self, f: impl FnOnce() -> R) -> R {
        let mut f = Some(f);
        let mut result = None;
        self.progress.suspend(&mut || {
            if let Some(f) = f.take() {
                result = Some(f());
            }
        });
        match (result, f) {
            (Some(result), _) => result,
            // A sink that never calls back still has to run the work
            (None, Some(f)) => f(),
            (None, None) => unreachable!("closure taken without producing a result"),
        }
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}
