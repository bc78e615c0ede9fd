//! Procedures that change the host

use crate::core::{Step, StepMetadata, StepRun};
use crate::error::Result;
use crate::system::{shell_escape, SystemInteraction};
use std::rc::Rc;
use tracing::info;

/// Runs the installer with the arguments bound to this step
pub struct InstallerRun {
    metadata: StepMetadata,
    system: Rc<dyn SystemInteraction>,
    installer: String,
}

impl InstallerRun {
    pub const LABEL: &'static str = "installer_run";

    pub fn new(system: Rc<dyn SystemInteraction>, installer: impl Into<String>) -> Self {
        Self {
            metadata: StepMetadata::procedure(Self::LABEL, "Run the installer"),
            system,
            installer: installer.into(),
        }
    }

    fn command_line(&self, arguments: &[String]) -> String {
        std::iter::once(shell_escape(&self.installer))
            .chain(arguments.iter().map(|arg| shell_escape(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Step for InstallerRun {
    fn metadata(&self) -> &StepMetadata {
        &self.metadata
    }

    fn run(&self, run: &mut StepRun<'_>) -> Result<()> {
        let command = self.command_line(run.arguments());
        info!("Running installer: {}", command);
        run.set_status("Running the installer");
        run.interactive(|| self.system.execute_interactive(&command))?;
        Ok(())
    }
}
