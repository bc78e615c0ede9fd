//! Core domain models
//!
//! Steps, their states, the shared scenario context and the scenarios that
//! compose steps into an ordered run.

pub mod config;
pub mod context;
pub mod features;
pub mod scenario;
pub mod state;
pub mod step;

pub use context::*;
pub use features::{FeatureOverrides, HostFeatures};
pub use scenario::*;
pub use state::*;
pub use step::*;
