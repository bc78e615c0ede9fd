//! preupgrade - pre-upgrade checks and preparation for a server host

pub mod cli;
pub mod core;
pub mod definitions;
pub mod error;
pub mod execution;
pub mod system;

// Re-export commonly used types
pub use crate::core::{ComposedScenario, Scenario, ScenarioContext, ScenarioStatus, Step, StepState};
pub use crate::error::{MaintainError, Result};
pub use crate::execution::{ProgressMode, RunEvent, ScenarioReport, ScenarioRunner};
pub use crate::system::{CommandExecutor, HostSystem, RepoRecord, SystemInteraction};
