//! Scenarios composed from the registered steps

use crate::core::{
    Composer, ContextValue, ParamSpec, Scenario, ScenarioContext, ScenarioMetadata,
    ScenarioParams, StepKind, ARGUMENTS,
};
use crate::definitions::checks::NonRhRepositoryCheck;
use crate::definitions::procedures::InstallerRun;
use crate::definitions::{all_steps, StepFilter};
use crate::error::Result;
use crate::system::SystemInteraction;
use std::rc::Rc;

/// Prepare the server for an upgrade to the next major release
pub struct PrepForUpgrade {
    metadata: ScenarioMetadata,
    system: Rc<dyn SystemInteraction>,
    installer: String,
    extra_arguments: Vec<String>,
}

impl PrepForUpgrade {
    pub const LABEL: &'static str = "prep_upgrade";
    pub const HOSTNAME_PARAM: &'static str = "satellite_hostname";

    pub fn new(system: Rc<dyn SystemInteraction>, installer: impl Into<String>) -> Self {
        Self {
            metadata: ScenarioMetadata {
                label: Self::LABEL.to_string(),
                description: "Prepare the server for upgrade".to_string(),
                params: vec![ParamSpec::required(
                    Self::HOSTNAME_PARAM,
                    "Hostname of the upgraded server",
                )],
            },
            system,
            installer: installer.into(),
            extra_arguments: Vec::new(),
        }
    }

    /// Arguments appended after the generated installer arguments
    pub fn with_extra_arguments(mut self, arguments: impl IntoIterator<Item = String>) -> Self {
        self.extra_arguments.extend(arguments);
        self
    }
}

impl Scenario for PrepForUpgrade {
    fn metadata(&self) -> &ScenarioMetadata {
        &self.metadata
    }

    fn compose(&self, _params: &ScenarioParams, composer: &mut Composer) -> Result<()> {
        composer
            .add_step(NonRhRepositoryCheck::new(self.system.clone()))?
            .add_step(InstallerRun::new(self.system.clone(), self.installer.clone()))?;
        Ok(())
    }

    fn set_context_mapping(
        &self,
        params: &ScenarioParams,
        context: &mut ScenarioContext,
    ) -> Result<()> {
        let hostname = params.require(Self::HOSTNAME_PARAM)?;
        let mut arguments = vec![format!(
            "--foreman-proxy-foreman-base-url=https://{}",
            hostname.trim()
        )];
        arguments.extend(self.extra_arguments.iter().cloned());

        context.map(ARGUMENTS, [(InstallerRun::LABEL, ContextValue::from(arguments))])
    }
}

/// All registered checks matching a filter, in registry order
pub struct TaggedChecks {
    metadata: ScenarioMetadata,
    system: Rc<dyn SystemInteraction>,
    installer: String,
    filter: StepFilter,
}

impl TaggedChecks {
    pub const LABEL: &'static str = "checks";

    pub fn new(
        system: Rc<dyn SystemInteraction>,
        installer: impl Into<String>,
        filter: StepFilter,
    ) -> Self {
        let description = if filter.is_empty() {
            "Run all checks".to_string()
        } else {
            format!("Run checks matching {}", filter)
        };
        Self {
            metadata: ScenarioMetadata {
                label: Self::LABEL.to_string(),
                description,
                params: Vec::new(),
            },
            system,
            installer: installer.into(),
            filter,
        }
    }
}

impl Scenario for TaggedChecks {
    fn metadata(&self) -> &ScenarioMetadata {
        &self.metadata
    }

    fn compose(&self, _params: &ScenarioParams, composer: &mut Composer) -> Result<()> {
        for step in all_steps(&self.system, &self.installer) {
            let metadata = step.metadata();
            if metadata.kind == StepKind::Check && self.filter.matches(metadata) {
                composer.add_boxed(step)?;
            }
        }
        Ok(())
    }
}
