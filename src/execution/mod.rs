//! Scenario execution

pub mod reporter;
pub mod runner;

pub use reporter::{ProgressMode, Spinner};
pub use runner::{EventHandler, RunEvent, ScenarioReport, ScenarioRunner, StepReport};
