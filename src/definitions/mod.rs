//! Concrete checks, procedures and scenarios

pub mod checks;
pub mod procedures;
pub mod scenarios;

pub use checks::{NonRhRepositoryCheck, RequiredCommandsCheck};
pub use procedures::InstallerRun;
pub use scenarios::{PrepForUpgrade, TaggedChecks};

use crate::core::{Step, StepMetadata};
use crate::system::SystemInteraction;
use std::fmt;
use std::rc::Rc;

/// Every known step, in registry order
pub fn all_steps(system: &Rc<dyn SystemInteraction>, installer: &str) -> Vec<Box<dyn Step>> {
    vec![
        Box::new(NonRhRepositoryCheck::new(system.clone())),
        Box::new(RequiredCommandsCheck::new(system.clone())),
        Box::new(InstallerRun::new(system.clone(), installer)),
    ]
}

/// Selects steps by tag and label
///
/// An empty list matches everything; otherwise a step has to carry one of
/// the tags and one of the labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepFilter {
    pub tags: Vec<String>,
    pub labels: Vec<String>,
}

impl StepFilter {
    pub fn matches(&self, metadata: &StepMetadata) -> bool {
        let tag_match = self.tags.is_empty() || self.tags.iter().any(|tag| metadata.has_tag(tag));
        let label_match =
            self.labels.is_empty() || self.labels.iter().any(|label| *label == metadata.label);
        tag_match && label_match
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.labels.is_empty()
    }
}

impl fmt::Display for StepFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.tags.is_empty() {
            parts.push(format!("tags {}", self.tags.join(", ")));
        }
        if !self.labels.is_empty() {
            parts.push(format!("labels {}", self.labels.join(", ")));
        }
        f.write_str(&parts.join("; "))
    }
}
