//! Pre-upgrade checks

use crate::core::{HostFeatures, Step, StepMetadata, StepRun};
use crate::error::Result;
use crate::system::{RepoRecord, SystemInteraction};
use std::rc::Rc;

pub const PRE_UPGRADE_TAG: &str = "pre_upgrade";

/// Fails when a non vendor repository such as EPEL is enabled
pub struct NonRhRepositoryCheck {
    metadata: StepMetadata,
    system: Rc<dyn SystemInteraction>,
}

impl NonRhRepositoryCheck {
    pub const LABEL: &'static str = "check_non_redhat_repository";

    pub fn new(system: Rc<dyn SystemInteraction>) -> Self {
        Self {
            metadata: StepMetadata::check(
                Self::LABEL,
                "Check whether the system has non Red Hat repositories (e.g. EPEL) enabled",
            )
            .with_tag(PRE_UPGRADE_TAG),
            system,
        }
    }
}

/// Enabled repositories whose id or base URL mentions EPEL
pub fn epel_repositories(repos: &[RepoRecord]) -> Vec<&RepoRecord> {
    repos
        .iter()
        .filter(|repo| {
            let mentions_epel =
                repo.id().contains("epel") || repo.get("baseurl").is_some_and(|url| url.contains("epel"));
            mentions_epel && repo.is_enabled()
        })
        .collect()
}

impl Step for NonRhRepositoryCheck {
    fn metadata(&self) -> &StepMetadata {
        &self.metadata
    }

    fn confine(&self, features: &HostFeatures) -> bool {
        features.downstream
    }

    fn run(&self, run: &mut StepRun<'_>) -> Result<()> {
        run.set_status("Checking repositories enabled on the system");
        let repos = self.system.repositories()?;
        let epel = epel_repositories(&repos);

        let ids: Vec<&str> = epel.iter().map(|repo| repo.id()).collect();
        run.assert(
            ids.is_empty(),
            format!(
                "System is subscribed to non Red Hat repositories (e.g. EPEL): {}",
                ids.join(", ")
            ),
        )
    }
}

/// Tools the upgrade procedures shell out to
const REQUIRED_COMMANDS: [&str; 3] = ["rpm", "findmnt", "lvs"];

/// Warns about tools missing from PATH
pub struct RequiredCommandsCheck {
    metadata: StepMetadata,
    system: Rc<dyn SystemInteraction>,
}

impl RequiredCommandsCheck {
    pub const LABEL: &'static str = "check_required_commands";

    pub fn new(system: Rc<dyn SystemInteraction>) -> Self {
        Self {
            metadata: StepMetadata::check(
                Self::LABEL,
                "Check that the tools used during the upgrade are installed",
            )
            .with_tag(PRE_UPGRADE_TAG),
            system,
        }
    }
}

impl Step for RequiredCommandsCheck {
    fn metadata(&self) -> &StepMetadata {
        &self.metadata
    }

    fn run(&self, run: &mut StepRun<'_>) -> Result<()> {
        run.set_status("Looking for required commands");
        let missing: Vec<&str> = REQUIRED_COMMANDS
            .into_iter()
            .filter(|command| !self.system.command_present(command))
            .collect();

        if !missing.is_empty() {
            run.warn(format!("Missing commands: {}", missing.join(", ")));
        }
        Ok(())
    }
}
