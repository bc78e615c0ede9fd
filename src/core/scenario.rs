//! Scenario domain model
//!
//! A [`Scenario`] is a recipe: it declares its parameters and, given bound
//! values for them, composes an ordered list of steps plus the context those
//! steps read. [`ComposedScenario`] is the result of running that recipe
//! once. It owns the steps, their states and the context for one run.

use crate::core::context::ScenarioContext;
use crate::core::state::{ScenarioStatus, StepState};
use crate::core::step::Step;
use crate::error::{MaintainError, Result};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Declared scenario parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioMetadata {
    pub label: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

/// Parameter values bound by the caller before composition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioParams {
    values: BTreeMap<String, String>,
}

impl ScenarioParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value of a required parameter
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| MaintainError::argument(format!("Missing required parameter '{}'", name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Recipe for an ordered set of steps
pub trait Scenario {
    fn metadata(&self) -> &ScenarioMetadata;

    /// Append the scenario's steps in execution order
    fn compose(&self, params: &ScenarioParams, composer: &mut Composer) -> Result<()>;

    /// Bind per-step context values before execution starts
    fn set_context_mapping(
        &self,
        _params: &ScenarioParams,
        _context: &mut ScenarioContext,
    ) -> Result<()> {
        Ok(())
    }

    fn label(&self) -> &str {
        &self.metadata().label
    }
}

/// Ordered step list builder handed to [`Scenario::compose`]
#[derive(Default)]
pub struct Composer {
    steps: Vec<Box<dyn Step>>,
    labels: HashSet<String>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step; labels must be unique within a scenario
    pub fn add_step(&mut self, step: impl Step + 'static) -> Result<&mut Self> {
        self.add_boxed(Box::new(step))
    }

    pub fn add_boxed(&mut self, step: Box<dyn Step>) -> Result<&mut Self> {
        let label = step.label().to_string();
        if !self.labels.insert(label.clone()) {
            return Err(MaintainError::argument(format!(
                "Step '{}' is already part of the scenario",
                label
            )));
        }
        self.steps.push(step);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn into_steps(self) -> Vec<Box<dyn Step>> {
        self.steps
    }
}

/// A step together with its state for the current run
pub struct StepSlot {
    pub step: Box<dyn Step>,
    pub state: StepState,
}

/// A scenario composed for one run
pub struct ComposedScenario {
    label: String,
    description: String,
    execution_id: Uuid,
    params: ScenarioParams,
    slots: Vec<StepSlot>,
    context: ScenarioContext,
    executed: bool,
}

impl ComposedScenario {
    /// Validate `params`, compose the steps and bind the context
    pub fn build(scenario: &dyn Scenario, params: ScenarioParams) -> Result<Self> {
        let metadata = scenario.metadata();
        validate_params(metadata, &params)?;

        let mut composer = Composer::new();
        scenario.compose(&params, &mut composer)?;

        let mut context = ScenarioContext::new();
        scenario.set_context_mapping(&params, &mut context)?;

        let slots = composer
            .into_steps()
            .into_iter()
            .map(|step| StepSlot {
                step,
                state: StepState::NotRun,
            })
            .collect();

        Ok(Self {
            label: metadata.label.clone(),
            description: metadata.description.clone(),
            execution_id: Uuid::new_v4(),
            params,
            slots,
            context,
            executed: false,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn params(&self) -> &ScenarioParams {
        &self.params
    }

    pub fn steps(&self) -> &[StepSlot] {
        &self.slots
    }

    /// Step labels in execution order
    pub fn labels(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.step.label()).collect()
    }

    pub fn context(&self) -> &ScenarioContext {
        &self.context
    }

    /// Bind extra context before the run (e.g. from the configuration file)
    pub fn bind_context(&mut self) -> &mut ScenarioContext {
        &mut self.context
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Aggregate of the step states recorded so far
    pub fn status(&self) -> ScenarioStatus {
        ScenarioStatus::aggregate(self.slots.iter().map(|slot| &slot.state))
    }

    /// Mark the scenario as running and freeze composition-time bindings
    pub(crate) fn begin(&mut self) -> Result<()> {
        if self.executed {
            return Err(MaintainError::argument(format!(
                "Scenario '{}' has already been executed",
                self.label
            )));
        }
        self.executed = true;
        self.context.seal();
        Ok(())
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [StepSlot], &mut ScenarioContext) {
        (&mut self.slots, &mut self.context)
    }
}

fn validate_params(metadata: &ScenarioMetadata, params: &ScenarioParams) -> Result<()> {
    for spec in &metadata.params {
        match params.get(&spec.name) {
            Some(value) if value.trim().is_empty() => {
                return Err(MaintainError::argument(format!(
                    "Parameter '{}' must not be empty",
                    spec.name
                )));
            }
            None if spec.required => {
                return Err(MaintainError::argument(format!(
                    "Missing required parameter '{}' ({})",
                    spec.name, spec.description
                )));
            }
            _ => {}
        }
    }

    for (name, _) in params.iter() {
        if !metadata.params.iter().any(|spec| spec.name == name) {
            return Err(MaintainError::argument(format!(
                "Scenario '{}' does not accept parameter '{}'",
                metadata.label, name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{ContextValue, ARGUMENTS};
    use crate::core::step::{StepMetadata, StepRun};

    struct Noop(StepMetadata);

    impl Noop {
        fn new(label: &str) -> Self {
            Noop(StepMetadata::check(label, "does nothing"))
        }
    }

    impl Step for Noop {
        fn metadata(&self) -> &StepMetadata {
            &self.0
        }

        fn run(&self, _run: &mut StepRun<'_>) -> Result<()> {
            Ok(())
        }
    }

    struct ThreeSteps {
        metadata: ScenarioMetadata,
    }

    impl ThreeSteps {
        fn new() -> Self {
            Self {
                metadata: ScenarioMetadata {
                    label: "three".to_string(),
                    description: "three steps".to_string(),
                    params: vec![
                        ParamSpec::required("host", "Target host"),
                        ParamSpec::optional("note", "Free text"),
                    ],
                },
            }
        }
    }

    impl Scenario for ThreeSteps {
        fn metadata(&self) -> &ScenarioMetadata {
            &self.metadata
        }

        fn compose(&self, _params: &ScenarioParams, composer: &mut Composer) -> Result<()> {
            composer
                .add_step(Noop::new("a"))?
                .add_step(Noop::new("b"))?
                .add_step(Noop::new("c"))?;
            Ok(())
        }

        fn set_context_mapping(
            &self,
            params: &ScenarioParams,
            context: &mut ScenarioContext,
        ) -> Result<()> {
            let host = params.require("host")?;
            context.map(ARGUMENTS, [("c", ContextValue::from(vec![format!("--host={}", host)]))])
        }
    }

    #[test]
    fn test_build_preserves_order_and_binds_context() {
        let composed =
            ComposedScenario::build(&ThreeSteps::new(), ScenarioParams::new().set("host", "sat"))
                .unwrap();

        assert_eq!(composed.labels(), vec!["a", "b", "c"]);
        assert!(composed.steps().iter().all(|slot| slot.state == StepState::NotRun));
        assert_eq!(composed.context().arguments("c"), ["--host=sat"]);
        assert!(composed.context().arguments("a").is_empty());
        assert_eq!(composed.status(), ScenarioStatus::Success);
    }

    #[test]
    fn test_missing_required_param() {
        let err = ComposedScenario::build(&ThreeSteps::new(), ScenarioParams::new())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Missing required parameter 'host'"));
    }

    #[test]
    fn test_empty_and_unknown_params_rejected() {
        let empty = ScenarioParams::new().set("host", "  ");
        assert!(ComposedScenario::build(&ThreeSteps::new(), empty).is_err());

        let unknown = ScenarioParams::new().set("host", "sat").set("bogus", "1");
        let err = ComposedScenario::build(&ThreeSteps::new(), unknown).err().unwrap();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let mut composer = Composer::new();
        composer.add_step(Noop::new("a")).unwrap();
        assert!(composer.add_step(Noop::new("a")).is_err());
        assert_eq!(composer.len(), 1);
    }

    #[test]
    fn test_begin_seals_and_runs_once() {
        let mut composed =
            ComposedScenario::build(&ThreeSteps::new(), ScenarioParams::new().set("host", "sat"))
                .unwrap();
        composed.begin().unwrap();
        assert!(composed.context().is_sealed());
        assert!(composed.begin().is_err());
        assert!(composed
            .bind_context()
            .bind(ARGUMENTS, "a", ContextValue::Flag(true))
            .is_err());
    }
}
